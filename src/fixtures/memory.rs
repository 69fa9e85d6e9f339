use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    error::ApiError,
    mirror::MirrorLink,
    provider::{Provider, Target},
    record::{ProjectRecord, Record},
};

/// In-memory `Provider` for exercising workflows without a server.
#[derive(Default)]
pub struct MemoryProvider {
    pub base_url: String,
    pub group_projects: HashMap<String, Vec<ProjectRecord>>,
    pub projects: HashMap<String, ProjectRecord>,
    pub variables: Mutex<HashMap<Target, Vec<Record>>>,
    /// Variable keys whose creation is answered with a 422.
    pub rejected_keys: HashSet<String>,
    pub created: Mutex<Vec<(Target, Record)>>,
    pub mirrors: Mutex<Vec<(String, MirrorLink)>>,
}

impl MemoryProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group_id: &str, projects: Vec<ProjectRecord>) -> Self {
        for project in &projects {
            if let Some(id) = project.id() {
                self.projects.insert(id.to_string(), project.clone());
            }
        }
        self.group_projects.insert(group_id.to_string(), projects);
        self
    }

    pub fn with_variables(self, owner: Target, variables: Vec<Record>) -> Self {
        self.variables
            .lock()
            .unwrap()
            .insert(owner, variables);
        self
    }

    pub fn rejecting(mut self, key: &str) -> Self {
        self.rejected_keys.insert(key.to_string());
        self
    }

    pub fn created(&self) -> Vec<(Target, Record)> {
        self.created.lock().unwrap().clone()
    }

    pub fn mirrors(&self) -> Vec<(String, MirrorLink)> {
        self.mirrors.lock().unwrap().clone()
    }

    fn not_found(&self, resource: &str) -> ApiError {
        ApiError::Status {
            url: format!("{}/api/v4/{}", self.base_url, resource),
            status: StatusCode::NOT_FOUND,
            body: "{\"message\":\"404 Not found\"}".to_string(),
        }
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_groups(&self) -> Result<Vec<Record>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        Ok(self.projects.values().cloned().collect())
    }

    async fn list_group_projects(
        &self,
        group_id: &str,
        _include_subgroups: bool,
    ) -> Result<Vec<ProjectRecord>, ApiError> {
        self.group_projects
            .get(group_id)
            .cloned()
            .ok_or_else(|| self.not_found(&format!("groups/{}/projects", group_id)))
    }

    async fn list_variables(&self, owner: &Target) -> Result<Vec<Record>, ApiError> {
        Ok(self
            .variables
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_variable(&self, owner: &Target, variable: &Record) -> Result<(), ApiError> {
        let key = variable
            .get("key")
            .and_then(|k| k.as_str())
            .unwrap_or_default();
        if self.rejected_keys.contains(key) {
            return Err(ApiError::Status {
                url: format!("{}/api/v4/{}", self.base_url, owner.variables_resource()),
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: "{\"message\":{\"key\":[\"has already been taken\"]}}".to_string(),
            });
        }

        self.created
            .lock()
            .unwrap()
            .push((owner.clone(), variable.clone()));
        self.variables
            .lock()
            .unwrap()
            .entry(owner.clone())
            .or_default()
            .push(variable.clone());
        Ok(())
    }

    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, ApiError> {
        self.projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| self.not_found(&format!("projects/{}", project_id)))
    }

    async fn create_remote_mirror(
        &self,
        project_id: &str,
        link: &MirrorLink,
    ) -> Result<(), ApiError> {
        if !self.projects.contains_key(project_id) {
            return Err(self.not_found(&format!("projects/{}/remote_mirrors", project_id)));
        }

        self.mirrors
            .lock()
            .unwrap()
            .push((project_id.to_string(), link.clone()));
        Ok(())
    }
}
