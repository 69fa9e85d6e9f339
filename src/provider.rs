use std::fmt;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    mirror::MirrorLink,
    record::{ProjectRecord, Record},
};

/// Owner of a set of CI/CD variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Group(String),
    Project(String),
}

impl Target {
    pub fn variables_resource(&self) -> String {
        match self {
            Target::Group(id) => format!("groups/{}/variables", id),
            Target::Project(id) => format!("projects/{}/variables", id),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Group(id) => write!(f, "group {}", id),
            Target::Project(id) => write!(f, "project {}", id),
        }
    }
}

/// The API surface of one instance that migrations are driven through.
///
/// An implementation is bound to a single endpoint; callers choose between a
/// source and a destination provider instead of flipping shared state.
#[async_trait]
pub trait Provider: Send + Sync {
    fn base_url(&self) -> &str;

    async fn list_groups(&self) -> Result<Vec<Record>, ApiError>;

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError>;

    async fn list_group_projects(
        &self,
        group_id: &str,
        include_subgroups: bool,
    ) -> Result<Vec<ProjectRecord>, ApiError>;

    async fn list_variables(&self, owner: &Target) -> Result<Vec<Record>, ApiError>;

    async fn create_variable(&self, owner: &Target, variable: &Record) -> Result<(), ApiError>;

    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, ApiError>;

    async fn create_remote_mirror(&self, project_id: &str, link: &MirrorLink)
        -> Result<(), ApiError>;
}
