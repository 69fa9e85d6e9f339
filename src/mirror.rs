//! Registering destination projects as push mirrors of source repositories.

use reqwest::Url;
use serde::Serialize;

use crate::{
    credentials::{CredentialProvider, MirrorCredentials},
    error::{ApiError, MigrationError},
    provider::Provider,
    record::ProjectRecord,
    resolver::{resolve, MatchPolicy},
};

/// Body of `POST /projects/:id/remote_mirrors`. Carries credentials, never
/// written anywhere but the request.
#[derive(Clone, PartialEq, Serialize)]
pub struct MirrorLink {
    pub enabled: bool,
    pub url: String,
}

impl std::fmt::Debug for MirrorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorLink")
            .field("enabled", &self.enabled)
            .field("url", &"<redacted>")
            .finish()
    }
}

/// `{base}/{path_with_namespace}.git` with the credentials embedded as
/// userinfo. Special characters in the credentials are percent-encoded.
pub fn mirror_url(
    base_url: &str,
    credentials: &MirrorCredentials,
    path_with_namespace: &str,
) -> Result<String, ApiError> {
    let invalid = |message: &str| ApiError::InvalidUrl {
        url: base_url.to_string(),
        message: message.to_string(),
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
    url.set_username(&credentials.user)
        .map_err(|_| invalid("cannot carry a username"))?;
    url.set_password(Some(&credentials.password))
        .map_err(|_| invalid("cannot carry a password"))?;

    let path = format!(
        "{}/{}.git",
        url.path().trim_end_matches('/'),
        path_with_namespace.trim_matches('/')
    );
    url.set_path(&path);

    Ok(url.to_string())
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    /// `(source id, target id)` pairs that were linked.
    pub mirrored: Vec<(String, String)>,
    /// Source projects (`namespace/name`) without a counterpart or an id.
    pub skipped: Vec<String>,
    /// Source projects whose mirror could not be created, with the reason.
    pub failed: Vec<(String, String)>,
}

pub struct Mirrorer<'a, P: Provider + ?Sized> {
    source: &'a P,
    destination: &'a P,
    policy: MatchPolicy,
}

impl<'a, P: Provider + ?Sized> Mirrorer<'a, P> {
    pub fn new(source: &'a P, destination: &'a P) -> Self {
        Self {
            source,
            destination,
            policy: MatchPolicy::NamespacedName,
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make `target_id` on the destination a push mirror of `source_id`.
    pub async fn mirror_project(
        &self,
        source_id: &str,
        target_id: &str,
        credentials: &mut dyn CredentialProvider,
    ) -> Result<(), MigrationError> {
        let project = self.source.get_project(source_id).await?;
        let path = project
            .path_with_namespace()
            .ok_or_else(|| MigrationError::MissingField {
                entity: "source project",
                id: source_id.to_string(),
                field: "path_with_namespace",
            })?;

        let credentials = credentials.mirror_credentials()?;
        let link = MirrorLink {
            enabled: true,
            url: mirror_url(self.destination.base_url(), &credentials, path)?,
        };

        self.destination
            .create_remote_mirror(target_id, &link)
            .await?;

        tracing::info!(
            "created mirror of {} (project {}) on project {}",
            path,
            source_id,
            target_id
        );
        Ok(())
    }

    /// Mirror every source group project that has a counterpart in the
    /// target group. Misses and per-project failures are logged and skipped.
    pub async fn mirror_group(
        &self,
        source_group: &str,
        target_group: &str,
        credentials: &mut dyn CredentialProvider,
    ) -> Result<MirrorSummary, MigrationError> {
        let source_projects = self
            .source
            .list_group_projects(source_group, true)
            .await?;
        let target_projects = self
            .destination
            .list_group_projects(target_group, false)
            .await?;

        tracing::info!(
            "mirroring {} project(s) from group {} into group {}",
            source_projects.len(),
            source_group,
            target_group
        );

        let mut summary = MirrorSummary::default();
        for source in &source_projects {
            let label = describe(source);
            let source_id = match source.id() {
                Some(id) => id.to_string(),
                None => {
                    tracing::warn!("source project {} has no id, skipping", label);
                    summary.skipped.push(label);
                    continue;
                }
            };

            let target_id = match resolve(&self.policy, &target_projects, source) {
                Some(id) => id.to_string(),
                None => {
                    tracing::warn!("target project {} not found, skipping", label);
                    summary.skipped.push(label);
                    continue;
                }
            };

            match self
                .mirror_project(&source_id, &target_id, &mut *credentials)
                .await
            {
                Ok(()) => summary.mirrored.push((source_id, target_id)),
                Err(err) => {
                    tracing::error!("error mirroring project {}: {}", label, err);
                    summary.failed.push((source_id, err.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

fn describe(project: &ProjectRecord) -> String {
    project
        .namespaced_name()
        .or_else(|| project.name().map(str::to_string))
        .unwrap_or_else(|| "<unnamed>".to_string())
}
