//! Variable migration: choosing the mode, exporting from the source, planning
//! against the destination and replaying.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::MigrationError,
    provider::{Provider, Target},
    record::{ProjectRecord, Record},
    resolver::{resolve, MatchPolicy},
    transfer::{TransferExecutor, TransferOptions, TransferReport},
};

/// Which source variables to read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableScope {
    Group(String),
    Project(String),
    /// Every project in the group, each with its own variables.
    GroupProjects(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationMode {
    Project { source: String, destination: String },
    Group { source: String, destination: String },
    RecursiveGroup { source: String, destination: String },
}

impl MigrationMode {
    /// Pick the mode from the ids given on the command line. Group ids pair
    /// with group ids and project ids with project ids.
    pub fn select(
        group: Option<&str>,
        project: Option<&str>,
        destination_group: Option<&str>,
        destination_project: Option<&str>,
        recursive: bool,
    ) -> Result<Self, MigrationError> {
        let selection = |message: &str| Err(MigrationError::Selection(message.to_string()));

        match (group, project, destination_group, destination_project) {
            (Some(_), Some(_), _, _) => selection("give either a source group or a source project, not both"),
            (_, _, Some(_), Some(_)) => {
                selection("give either a destination group or a destination project, not both")
            }
            (Some(source), None, Some(destination), None) => {
                let (source, destination) = (source.to_string(), destination.to_string());
                if recursive {
                    Ok(MigrationMode::RecursiveGroup { source, destination })
                } else {
                    Ok(MigrationMode::Group { source, destination })
                }
            }
            (None, Some(_), None, Some(_)) if recursive => {
                selection("recursive mode is not supported for individual projects")
            }
            (None, Some(source), None, Some(destination)) => Ok(MigrationMode::Project {
                source: source.to_string(),
                destination: destination.to_string(),
            }),
            (Some(_), None, None, Some(_)) => {
                selection("a source group needs a destination group (--destination-group)")
            }
            (None, Some(_), Some(_), None) => {
                selection("a source project needs a destination project (--destination-project)")
            }
            _ => selection(
                "source and destination ids are required: -g with --destination-group, or -p with --destination-project",
            ),
        }
    }

    pub fn scope(&self) -> VariableScope {
        match self {
            MigrationMode::Project { source, .. } => VariableScope::Project(source.clone()),
            MigrationMode::Group { source, .. } => VariableScope::Group(source.clone()),
            MigrationMode::RecursiveGroup { source, .. } => {
                VariableScope::GroupProjects(source.clone())
            }
        }
    }

    pub fn target(&self) -> Target {
        match self {
            MigrationMode::Project { destination, .. } => Target::Project(destination.clone()),
            MigrationMode::Group { destination, .. }
            | MigrationMode::RecursiveGroup { destination, .. } => {
                Target::Group(destination.clone())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectVariables {
    pub project_name: String,
    /// `namespace.name` of the source project. Absent in snapshots written
    /// without it, in which case only name matching can find a counterpart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub variables: Vec<Record>,
}

/// Exported variables, in the shape they are saved to and read back from disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableExport {
    /// Variables of one group or project.
    Flat(Vec<Record>),
    /// Source project id -> name and variables.
    ByProject(BTreeMap<String, ProjectVariables>),
}

/// An export together with the source projects whose variables could not be
/// read. Those projects are left out of `variables`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceExport {
    pub variables: VariableExport,
    pub unreadable: Vec<UnreadableProject>,
}

impl From<VariableExport> for SourceExport {
    fn from(variables: VariableExport) -> Self {
        Self {
            variables,
            unreadable: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnreadableProject {
    pub source_id: String,
    pub project_name: String,
    pub reason: String,
}

impl VariableExport {
    pub fn variable_count(&self) -> usize {
        match self {
            VariableExport::Flat(records) => records.len(),
            VariableExport::ByProject(projects) => {
                projects.values().map(|p| p.variables.len()).sum()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub source_id: String,
    pub project_name: String,
    pub destination_id: u64,
    pub variables: Vec<Record>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedProject {
    pub source_id: String,
    pub project_name: String,
}

/// Everything a recursive migration will write, decided before the first
/// write happens.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransferPlan {
    pub entries: Vec<PlanEntry>,
    pub skipped: Vec<SkippedProject>,
}

/// Match every exported project against the destination listing. Projects
/// without a counterpart end up in `skipped`, never in `entries`.
pub fn build_plan(
    export: &BTreeMap<String, ProjectVariables>,
    destination: &[ProjectRecord],
    policy: &MatchPolicy,
) -> TransferPlan {
    let mut plan = TransferPlan::default();

    for (source_id, project) in export {
        let source = source_project(source_id, project);

        match resolve(policy, destination, &source) {
            Some(destination_id) => plan.entries.push(PlanEntry {
                source_id: source_id.clone(),
                project_name: project.project_name.clone(),
                destination_id,
                variables: project.variables.clone(),
            }),
            None => {
                tracing::warn!(
                    "project {} not found in destination group, skipping",
                    project.project_name
                );
                plan.skipped.push(SkippedProject {
                    source_id: source_id.clone(),
                    project_name: project.project_name.clone(),
                });
            }
        }
    }

    plan
}

/// Rebuild enough of the source listing entry for any `MatchPolicy` to work.
fn source_project(source_id: &str, project: &ProjectVariables) -> ProjectRecord {
    let mut record = Record::new();
    if let Ok(id) = source_id.parse::<u64>() {
        record.insert("id".to_string(), id.into());
    }
    record.insert("name".to_string(), project.project_name.as_str().into());
    if let Some(namespace) = &project.namespace {
        record.insert("namespace".to_string(), json!({ "name": namespace }));
    }
    ProjectRecord::new(record)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub reports: Vec<TransferReport>,
    pub skipped_projects: Vec<SkippedProject>,
    /// Source projects left out because their variables could not be listed.
    pub unreadable_projects: Vec<UnreadableProject>,
}

impl MigrationSummary {
    pub fn created(&self) -> usize {
        self.reports.iter().map(TransferReport::created).sum()
    }

    pub fn already_present(&self) -> usize {
        self.reports.iter().map(TransferReport::already_present).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(TransferReport::failed).sum()
    }
}

pub struct Migrator<'a, P: Provider + ?Sized> {
    source: &'a P,
    destination: &'a P,
    policy: MatchPolicy,
    options: TransferOptions,
}

impl<'a, P: Provider + ?Sized> Migrator<'a, P> {
    /// `source` is read from, `destination` is written to.
    pub fn new(source: &'a P, destination: &'a P) -> Self {
        Self {
            source,
            destination,
            policy: MatchPolicy::ExactName,
            options: TransferOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Read variables from the source instance. See `export_variables` for
    /// which failures are fatal.
    pub async fn export(&self, scope: &VariableScope) -> Result<SourceExport, MigrationError> {
        export_variables(self.source, scope).await
    }

    /// Replay an export onto `target` on the destination instance.
    pub async fn apply(
        &self,
        target: &Target,
        export: &VariableExport,
    ) -> Result<MigrationSummary, MigrationError> {
        let executor = TransferExecutor::new(self.destination, self.options);

        match (export, target) {
            (VariableExport::Flat(records), _) => {
                tracing::info!("migrating {} variable(s) to {}", records.len(), target);
                let report = executor.create_records_for(target, records).await;
                Ok(MigrationSummary {
                    reports: vec![report],
                    ..MigrationSummary::default()
                })
            }
            (VariableExport::ByProject(projects), Target::Group(group_id)) => {
                let destination_projects = self
                    .destination
                    .list_group_projects(group_id, false)
                    .await?;
                let plan = build_plan(projects, &destination_projects, &self.policy);

                tracing::info!(
                    "migrating {} project(s) into group {} ({} without counterpart)",
                    plan.entries.len(),
                    group_id,
                    plan.skipped.len()
                );

                Ok(self.execute_plan(&executor, plan).await)
            }
            (VariableExport::ByProject(_), Target::Project(_)) => Err(MigrationError::Selection(
                "per-project variables can only be applied to a destination group".to_string(),
            )),
        }
    }

    /// Export from the source and apply to the destination in one go.
    pub async fn migrate(
        &self,
        mode: &MigrationMode,
    ) -> Result<(VariableExport, MigrationSummary), MigrationError> {
        let export = self.export(&mode.scope()).await?;
        let mut summary = self.apply(&mode.target(), &export.variables).await?;
        summary.unreadable_projects = export.unreadable;

        Ok((export.variables, summary))
    }

    async fn execute_plan(
        &self,
        executor: &TransferExecutor<'_, P>,
        plan: TransferPlan,
    ) -> MigrationSummary {
        let mut summary = MigrationSummary {
            reports: Vec::with_capacity(plan.entries.len()),
            skipped_projects: plan.skipped,
            ..MigrationSummary::default()
        };

        for entry in plan.entries {
            tracing::info!(
                "migrating variables for project {} (ID: {})",
                entry.project_name,
                entry.destination_id
            );
            let target = Target::Project(entry.destination_id.to_string());
            summary
                .reports
                .push(executor.create_records_for(&target, &entry.variables).await);
        }

        summary
    }
}

/// Read the variables `scope` names.
///
/// For a single group or project, and for the listing of a group's projects,
/// a failure is returned as an error. Once that listing is in, a project whose
/// variables cannot be read is logged and reported in `unreadable`, and the
/// rest of the group is still exported.
pub async fn export_variables<P: Provider + ?Sized>(
    provider: &P,
    scope: &VariableScope,
) -> Result<SourceExport, MigrationError> {
    match scope {
        VariableScope::Group(id) => Ok(VariableExport::Flat(
            provider.list_variables(&Target::Group(id.clone())).await?,
        )
        .into()),
        VariableScope::Project(id) => Ok(VariableExport::Flat(
            provider.list_variables(&Target::Project(id.clone())).await?,
        )
        .into()),
        VariableScope::GroupProjects(group_id) => {
            let projects = provider.list_group_projects(group_id, false).await?;
            let mut by_project = BTreeMap::new();
            let mut unreadable = Vec::new();

            for project in &projects {
                let (id, name) = match (project.id(), project.name()) {
                    (Some(id), Some(name)) => (id.to_string(), name.to_string()),
                    _ => {
                        return Err(MigrationError::MissingField {
                            entity: "project in group",
                            id: group_id.clone(),
                            field: "id/name",
                        })
                    }
                };

                let variables = match provider
                    .list_variables(&Target::Project(id.clone()))
                    .await
                {
                    Ok(variables) => variables,
                    Err(err) => {
                        tracing::error!(
                            "error fetching variables for project {} (ID: {}), skipping: {}",
                            name,
                            id,
                            err
                        );
                        unreadable.push(UnreadableProject {
                            source_id: id,
                            project_name: name,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                };
                tracing::debug!("project {} has {} variable(s)", name, variables.len());

                by_project.insert(
                    id,
                    ProjectVariables {
                        project_name: name,
                        namespace: project.namespace_name().map(str::to_string),
                        variables,
                    },
                );
            }

            Ok(SourceExport {
                variables: VariableExport::ByProject(by_project),
                unreadable,
            })
        }
    }
}
