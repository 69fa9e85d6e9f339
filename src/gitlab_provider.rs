use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    cli::InstanceEndpoint,
    error::ApiError,
    http::TOKEN_HEADER,
    mirror::MirrorLink,
    pagination::{collect_pages, PER_PAGE},
    provider::{Provider, Target},
    record::{ProjectRecord, Record, ResourcePage},
    retry::{with_retry, RetryPolicy},
};

/// `Provider` backed by the GitLab v4 REST API of a single instance.
#[derive(Clone, Debug)]
pub struct GitlabProvider {
    endpoint: InstanceEndpoint,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GitlabProvider {
    pub fn new(endpoint: InstanceEndpoint, client: reqwest::Client) -> Self {
        Self {
            endpoint,
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{base}/api/v4/{resource}",
            base = self.endpoint.base_url.trim_end_matches('/'),
            resource = resource
        )
    }

    /// One attempt at one page.
    async fn request_page(
        &self,
        resource: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<ResourcePage, ApiError> {
        let url = self.url(resource);
        let per_page = PER_PAGE.to_string();
        let page_number = page.to_string();

        let mut params = vec![("per_page", per_page.as_str()), ("page", page_number.as_str())];
        params.extend_from_slice(query);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.endpoint.token)
            .query(&params)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;

        let records = read_json(&url, response).await?;

        Ok(ResourcePage { page, records })
    }

    /// Fetch a single page, retrying transport, status and decode failures.
    pub async fn fetch_page(
        &self,
        resource: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<ResourcePage, ApiError> {
        let label = format!("GET {} (page {})", resource, page);

        with_retry(self.retry, &label, move || {
            self.request_page(resource, query, page)
        })
        .await
    }

    /// Fetch every page of a collection until an empty page comes back.
    pub async fn fetch_all(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Record>, ApiError> {
        let records = collect_pages(move |page| self.fetch_page(resource, query, page)).await?;

        tracing::debug!(
            "fetched {} record(s) from {}",
            records.len(),
            self.url(resource)
        );

        Ok(records)
    }

    async fn get_json<T: DeserializeOwned>(&self, resource: &str) -> Result<T, ApiError> {
        let url = self.url(resource);
        let url = url.as_str();
        let label = format!("GET {}", resource);

        with_retry(self.retry, &label, move || async move {
            let response = self
                .client
                .get(url)
                .header(TOKEN_HEADER, &self.endpoint.token)
                .send()
                .await
                .map_err(|e| ApiError::transport(url, e))?;

            read_json(url, response).await
        })
        .await
    }

    /// Single attempt; writes are never retried.
    async fn post_json<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(resource);
        let payload = serde_json::to_vec(body).map_err(|source| ApiError::Encode {
            url: url.clone(),
            source,
        })?;

        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.endpoint.token)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { url, status, body });
        }

        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::transport(url, e))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::decode(url, e.to_string()))
}

fn into_projects(records: Vec<Record>) -> Vec<ProjectRecord> {
    records.into_iter().map(ProjectRecord::new).collect()
}

#[async_trait]
impl Provider for GitlabProvider {
    fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    async fn list_groups(&self) -> Result<Vec<Record>, ApiError> {
        self.fetch_all("groups", &[]).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        Ok(into_projects(self.fetch_all("projects", &[]).await?))
    }

    async fn list_group_projects(
        &self,
        group_id: &str,
        include_subgroups: bool,
    ) -> Result<Vec<ProjectRecord>, ApiError> {
        let resource = format!("groups/{}/projects", group_id);
        let query: &[(&str, &str)] = if include_subgroups {
            &[("include_subgroups", "true")]
        } else {
            &[]
        };

        Ok(into_projects(self.fetch_all(&resource, query).await?))
    }

    async fn list_variables(&self, owner: &Target) -> Result<Vec<Record>, ApiError> {
        self.fetch_all(&owner.variables_resource(), &[]).await
    }

    async fn create_variable(&self, owner: &Target, variable: &Record) -> Result<(), ApiError> {
        self.post_json(&owner.variables_resource(), variable).await
    }

    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, ApiError> {
        let record: Record = self.get_json(&format!("projects/{}", project_id)).await?;
        Ok(ProjectRecord::new(record))
    }

    async fn create_remote_mirror(
        &self,
        project_id: &str,
        link: &MirrorLink,
    ) -> Result<(), ApiError> {
        self.post_json(&format!("projects/{}/remote_mirrors", project_id), link)
            .await
    }
}
