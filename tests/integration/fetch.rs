use crate::mocks::gitlab::{get_page_mock, get_page_mock_with, mount_listing, provider};

use fake::{Fake, Faker};
use gitlab_migrate::{
    fixtures::records::{project_json, variable_json},
    provider::{Provider, Target},
};
use serde_json::{json, Value};
use wiremock::{MockServer, ResponseTemplate};

fn variables(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| variable_json(&format!("{}_{}", prefix, i), &Faker.fake::<String>()))
        .collect()
}

mod pagination {
    use super::*;

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let mock_server = MockServer::start().await;
        let pages = vec![variables("P1", 100), variables("P2", 100), variables("P3", 37)];
        let expected: Vec<Value> = pages.iter().flatten().cloned().collect();

        mount_listing(&mock_server, "projects/7/variables", pages).await;

        let records = provider(&mock_server)
            .list_variables(&Target::Project("7".to_string()))
            .await
            .unwrap();

        assert_eq!(records.len(), 237);
        let records: Vec<Value> = records.into_iter().map(Value::Object).collect();
        assert_eq!(records, expected);

        mock_server.verify().await;
    }

    #[tokio::test]
    async fn group_projects_with_subgroups() {
        let mock_server = MockServer::start().await;

        get_page_mock_with(
            "groups/10/projects",
            1,
            &[("include_subgroups", "true")],
            ResponseTemplate::new(200).set_body_json(json!([
                project_json(1, "api", "platform"),
                project_json(2, "web", "platform/frontend"),
            ])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
        get_page_mock_with(
            "groups/10/projects",
            2,
            &[("include_subgroups", "true")],
            ResponseTemplate::new(200).set_body_json(json!([])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

        let projects = provider(&mock_server)
            .list_group_projects("10", true)
            .await
            .unwrap();

        let names: Vec<_> = projects.iter().filter_map(|p| p.namespaced_name()).collect();
        assert_eq!(names, vec!["platform/api", "platform/frontend/web"]);

        mock_server.verify().await;
    }
}

mod retries {
    use super::*;

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let mock_server = MockServer::start().await;

        get_page_mock("groups", 1, ResponseTemplate::new(500))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&mock_server)
            .await;
        mount_listing(&mock_server, "groups", vec![vec![json!({ "id": 1, "name": "g" })]]).await;

        let groups = provider(&mock_server).list_groups().await.unwrap();

        assert_eq!(groups.len(), 1);
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let mock_server = MockServer::start().await;

        get_page_mock("groups", 1, ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).list_groups().await;

        assert!(result.is_err());
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn retries_undecodable_body() {
        let mock_server = MockServer::start().await;

        get_page_mock(
            "projects/7/variables",
            1,
            ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;
        mount_listing(&mock_server, "projects/7/variables", vec![variables("V", 2)]).await;

        let records = provider(&mock_server)
            .list_variables(&Target::Project("7".to_string()))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn later_page_failure_fails_listing() {
        let mock_server = MockServer::start().await;

        get_page_mock(
            "groups/3/variables",
            1,
            ResponseTemplate::new(200).set_body_json(Value::Array(variables("V", 100))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
        get_page_mock("groups/3/variables", 2, ResponseTemplate::new(502))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .list_variables(&Target::Group("3".to_string()))
            .await;

        assert!(result.is_err());
        mock_server.verify().await;
    }
}
