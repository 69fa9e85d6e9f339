//! Replaying variable records onto a destination owner.

use std::collections::HashSet;

use serde_json::Value;

use crate::{
    provider::{Provider, Target},
    record::{variable_identity, Record},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// List the target's variables first and leave alone the ones already
    /// present (same key and environment scope). Off by default, in which
    /// case every record is submitted and re-runs may duplicate or fail.
    pub skip_existing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    Created,
    AlreadyPresent,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Position in the submitted list.
    pub index: usize,
    pub key: Option<String>,
    pub status: RecordStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReport {
    pub target: Target,
    pub outcomes: Vec<RecordOutcome>,
}

impl TransferReport {
    fn count(&self, wanted: fn(&RecordStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| wanted(&o.status)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Created))
    }

    pub fn already_present(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RecordStatus::Failed(_)))
    }
}

pub struct TransferExecutor<'a, P: Provider + ?Sized> {
    provider: &'a P,
    options: TransferOptions,
}

impl<'a, P: Provider + ?Sized> TransferExecutor<'a, P> {
    pub fn new(provider: &'a P, options: TransferOptions) -> Self {
        Self { provider, options }
    }

    /// Submit each record as its own creation request, in order.
    ///
    /// A failing record is reported and the next one is still attempted.
    /// Nothing already created is rolled back.
    pub async fn create_records_for(&self, target: &Target, records: &[Record]) -> TransferReport {
        let mut existing = if self.options.skip_existing {
            match self.existing_identities(target).await {
                Ok(existing) => Some(existing),
                Err(message) => return Self::all_failed(target, records, &message),
            }
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let key = record.get("key").and_then(Value::as_str).map(str::to_string);
            let label = key.as_deref().unwrap_or("<no key>");
            let identity = variable_identity(record);

            if let (Some(existing), Some(identity)) = (&existing, &identity) {
                if existing.contains(identity) {
                    tracing::info!("variable {} already exists on {}, skipping", label, target);
                    outcomes.push(RecordOutcome {
                        index,
                        key,
                        status: RecordStatus::AlreadyPresent,
                    });
                    continue;
                }
            }

            let status = match self.provider.create_variable(target, record).await {
                Ok(()) => {
                    tracing::info!("created variable {} on {}", label, target);
                    if let (Some(existing), Some(identity)) = (existing.as_mut(), identity) {
                        existing.insert(identity);
                    }
                    RecordStatus::Created
                }
                Err(err) => {
                    tracing::error!("error creating variable {} on {}: {}", label, target, err);
                    RecordStatus::Failed(err.to_string())
                }
            };

            outcomes.push(RecordOutcome { index, key, status });
        }

        TransferReport {
            target: target.clone(),
            outcomes,
        }
    }

    async fn existing_identities(
        &self,
        target: &Target,
    ) -> Result<HashSet<(String, String)>, String> {
        let current = self.provider.list_variables(target).await.map_err(|err| {
            let message = format!("could not list existing variables on {}: {}", target, err);
            tracing::error!("{}", message);
            message
        })?;

        Ok(current.iter().filter_map(variable_identity).collect())
    }

    fn all_failed(target: &Target, records: &[Record], message: &str) -> TransferReport {
        let outcomes = records
            .iter()
            .enumerate()
            .map(|(index, record)| RecordOutcome {
                index,
                key: record.get("key").and_then(Value::as_str).map(str::to_string),
                status: RecordStatus::Failed(message.to_string()),
            })
            .collect();

        TransferReport {
            target: target.clone(),
            outcomes,
        }
    }
}
