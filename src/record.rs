use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque JSON document as returned by the API.
///
/// Field order is preserved so a record replayed to another instance carries
/// exactly the fields it was fetched with.
pub type Record = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct ResourcePage {
    pub page: u32,
    pub records: Vec<Record>,
}

impl ResourcePage {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A project listing entry. Only the handful of fields needed for matching are
/// ever read; everything else passes through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRecord(Record);

impl ProjectRecord {
    pub fn new(record: Record) -> Self {
        Self(record)
    }

    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.0
            .get("namespace")
            .and_then(|namespace| namespace.get("name"))
            .and_then(Value::as_str)
    }

    pub fn path_with_namespace(&self) -> Option<&str> {
        self.0.get("path_with_namespace").and_then(Value::as_str)
    }

    /// `namespace/name`, the key group mirroring matches on.
    pub fn namespaced_name(&self) -> Option<String> {
        Some(format!("{}/{}", self.namespace_name()?, self.name()?))
    }

    pub fn as_record(&self) -> &Record {
        &self.0
    }
}

impl From<Record> for ProjectRecord {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// Identity of a variable on its owner, used by the opt-in existence check.
pub fn variable_identity(record: &Record) -> Option<(String, String)> {
    let key = record.get("key").and_then(Value::as_str)?;
    let scope = record
        .get("environment_scope")
        .and_then(Value::as_str)
        .unwrap_or("*");

    Some((key.to_string(), scope.to_string()))
}
