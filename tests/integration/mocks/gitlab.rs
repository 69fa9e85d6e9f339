use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gitlab_migrate::{
    cli::InstanceEndpoint, gitlab_provider::GitlabProvider, http::TOKEN_HEADER,
    retry::RetryPolicy,
};

pub const TOKEN: &str = "random_token";

/// Provider pointed at the mock server, retrying without waiting.
pub fn provider(server: &MockServer) -> GitlabProvider {
    GitlabProvider::new(
        InstanceEndpoint {
            base_url: server.uri(),
            token: TOKEN.to_string(),
        },
        reqwest::Client::new(),
    )
    .with_retry(RetryPolicy::new(3, Duration::ZERO))
}

fn api_path(resource: &str) -> String {
    format!("/api/v4/{}", resource)
}

pub fn get_page_mock(resource: &str, page: u32, response: ResponseTemplate) -> Mock {
    get_page_mock_with(resource, page, &[], response)
}

/// Page mock that also requires the given extra query parameters.
pub fn get_page_mock_with(
    resource: &str,
    page: u32,
    query: &[(&str, &str)],
    response: ResponseTemplate,
) -> Mock {
    let mut builder = Mock::given(method("GET"))
        .and(path(api_path(resource)))
        .and(query_param("page", page.to_string()))
        .and(query_param("per_page", "100"))
        .and(header(TOKEN_HEADER, TOKEN));

    for (key, value) in query {
        builder = builder.and(query_param(*key, *value));
    }

    builder.respond_with(response)
}

/// Mount one mock per page followed by the empty page that ends the listing.
/// Every page is expected exactly once.
pub async fn mount_listing(server: &MockServer, resource: &str, pages: Vec<Vec<Value>>) {
    let last = pages.len() as u32 + 1;

    for (index, records) in pages.into_iter().enumerate() {
        get_page_mock(
            resource,
            index as u32 + 1,
            ResponseTemplate::new(200).set_body_json(Value::Array(records)),
        )
        .expect(1)
        .mount(server)
        .await;
    }

    get_page_mock(resource, last, ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(server)
        .await;
}

pub fn get_mock(resource: &str, response: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(api_path(resource)))
        .and(header(TOKEN_HEADER, TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
}

/// POST whose body must equal `body` exactly.
pub fn post_mock(resource: &str, body: Value, status: u16) -> Mock {
    Mock::given(method("POST"))
        .and(path(api_path(resource)))
        .and(header(TOKEN_HEADER, TOKEN))
        .and(body_json(body))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
}

/// POST accepting any body.
pub fn post_any_mock(resource: &str, status: u16) -> Mock {
    Mock::given(method("POST"))
        .and(path(api_path(resource)))
        .and(header(TOKEN_HEADER, TOKEN))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
}
