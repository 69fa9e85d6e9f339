use crate::mocks::gitlab::{get_mock, mount_listing, post_any_mock, post_mock, provider};

use gitlab_migrate::{
    credentials::{MirrorCredentials, StaticCredentials},
    fixtures::records::project_json,
    mirror::Mirrorer,
};
use serde_json::json;
use wiremock::MockServer;

fn credentials() -> StaticCredentials {
    StaticCredentials(MirrorCredentials {
        user: "mirror-bot".to_string(),
        password: "s3cr3t".to_string(),
    })
}

#[tokio::test]
async fn single_project_posts_credentialed_url() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    get_mock("projects/1", project_json(1, "api", "platform"))
        .expect(1)
        .mount(&source)
        .await;

    let expected_url = format!(
        "{}/platform/api.git",
        destination
            .uri()
            .replacen("http://", "http://mirror-bot:s3cr3t@", 1)
    );
    post_mock(
        "projects/101/remote_mirrors",
        json!({ "enabled": true, "url": expected_url }),
        201,
    )
    .expect(1)
    .mount(&destination)
    .await;

    let (source_provider, destination_provider) = (provider(&source), provider(&destination));
    Mirrorer::new(&source_provider, &destination_provider)
        .mirror_project("1", "101", &mut credentials())
        .await
        .unwrap();

    source.verify().await;
    destination.verify().await;
}

#[tokio::test]
async fn group_mirrors_each_counterpart() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    mount_listing(
        &source,
        "groups/10/projects",
        vec![vec![
            project_json(1, "api", "platform"),
            project_json(2, "web", "platform"),
            project_json(3, "db", "platform"),
        ]],
    )
    .await;
    get_mock("projects/1", project_json(1, "api", "platform"))
        .mount(&source)
        .await;
    get_mock("projects/3", project_json(3, "db", "platform"))
        .mount(&source)
        .await;

    mount_listing(
        &destination,
        "groups/20/projects",
        vec![vec![
            project_json(101, "api", "platform"),
            project_json(103, "db", "platform"),
        ]],
    )
    .await;
    post_any_mock("projects/101/remote_mirrors", 201)
        .expect(1)
        .mount(&destination)
        .await;
    post_any_mock("projects/103/remote_mirrors", 500)
        .expect(1)
        .mount(&destination)
        .await;

    let (source_provider, destination_provider) = (provider(&source), provider(&destination));
    let summary = Mirrorer::new(&source_provider, &destination_provider)
        .mirror_group("10", "20", &mut credentials())
        .await
        .unwrap();

    assert_eq!(summary.mirrored, vec![("1".to_string(), "101".to_string())]);
    assert_eq!(summary.skipped, vec!["platform/web".to_string()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "3");

    destination.verify().await;
}
