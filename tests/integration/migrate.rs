use crate::mocks::gitlab::{get_page_mock, mount_listing, post_any_mock, post_mock, provider};

use fake::{Fake, Faker};
use gitlab_migrate::{
    fixtures::records::{project_json, to_record, variable_json},
    migrator::{MigrationMode, Migrator, VariableExport},
    provider::Target,
    snapshot::{read_input, save_output},
    transfer::TransferOptions,
};
use serde_json::{json, Value};
use wiremock::{MockServer, ResponseTemplate};

mod transfer {
    use super::*;

    #[tokio::test]
    async fn continues_past_rejected_record() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        let records: Vec<Value> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|key| variable_json(key, &Faker.fake::<String>()))
            .collect();

        post_mock("projects/7/variables", records[2].clone(), 422)
            .with_priority(1)
            .expect(1)
            .mount(&destination)
            .await;
        post_any_mock("projects/7/variables", 201)
            .expect(4)
            .mount(&destination)
            .await;

        let (source, destination_provider) = (provider(&source), provider(&destination));
        let export = VariableExport::Flat(records.into_iter().map(to_record).collect());

        let summary = Migrator::new(&source, &destination_provider)
            .apply(&Target::Project("7".to_string()), &export)
            .await
            .unwrap();

        assert_eq!(summary.created(), 4);
        assert_eq!(summary.failed(), 1);
        let failures: Vec<_> = summary.reports[0]
            .failures()
            .map(|f| f.key.clone())
            .collect();
        assert_eq!(failures, vec![Some("C".to_string())]);

        destination.verify().await;
    }

    #[tokio::test]
    async fn skip_existing_checks_target_first() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        mount_listing(
            &destination,
            "groups/20/variables",
            vec![vec![variable_json("EXISTING", "old")]],
        )
        .await;
        post_mock("groups/20/variables", variable_json("NEW", "1"), 201)
            .expect(1)
            .mount(&destination)
            .await;

        let (source, destination_provider) = (provider(&source), provider(&destination));
        let export = VariableExport::Flat(vec![
            to_record(variable_json("EXISTING", "new")),
            to_record(variable_json("NEW", "1")),
        ]);

        let summary = Migrator::new(&source, &destination_provider)
            .with_options(TransferOptions {
                skip_existing: true,
            })
            .apply(&Target::Group("20".to_string()), &export)
            .await
            .unwrap();

        assert_eq!(summary.created(), 1);
        assert_eq!(summary.already_present(), 1);
        destination.verify().await;
    }
}

mod recursive {
    use super::*;

    #[tokio::test]
    async fn matched_projects_only() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        mount_listing(
            &source,
            "groups/10/projects",
            vec![vec![project_json(1, "A", "G"), project_json(2, "B", "G")]],
        )
        .await;
        mount_listing(
            &source,
            "projects/1/variables",
            vec![vec![variable_json("A_TOKEN", "a")]],
        )
        .await;
        mount_listing(
            &source,
            "projects/2/variables",
            vec![vec![variable_json("B_TOKEN", "b")]],
        )
        .await;

        mount_listing(
            &destination,
            "groups/20/projects",
            vec![vec![project_json(101, "A", "G2"), project_json(103, "C", "G2")]],
        )
        .await;
        post_mock("projects/101/variables", variable_json("A_TOKEN", "a"), 201)
            .expect(1)
            .mount(&destination)
            .await;
        post_any_mock("projects/103/variables", 201)
            .expect(0)
            .mount(&destination)
            .await;

        let (source_provider, destination_provider) = (provider(&source), provider(&destination));
        let mode = MigrationMode::select(Some("10"), None, Some("20"), None, true).unwrap();

        let (export, summary) = Migrator::new(&source_provider, &destination_provider)
            .migrate(&mode)
            .await
            .unwrap();

        assert_eq!(export.variable_count(), 2);
        assert_eq!(summary.created(), 1);
        assert_eq!(summary.failed(), 0);
        assert_eq!(summary.skipped_projects.len(), 1);
        assert_eq!(summary.skipped_projects[0].project_name, "B");

        source.verify().await;
        destination.verify().await;
    }

    #[tokio::test]
    async fn unreadable_project_does_not_stop_the_rest() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        mount_listing(
            &source,
            "groups/10/projects",
            vec![vec![project_json(1, "A", "G"), project_json(2, "B", "G")]],
        )
        .await;
        mount_listing(
            &source,
            "projects/1/variables",
            vec![vec![variable_json("A_TOKEN", "a")]],
        )
        .await;
        get_page_mock(
            "projects/2/variables",
            1,
            ResponseTemplate::new(403).set_body_json(json!({ "message": "403 Forbidden" })),
        )
        .expect(3)
        .mount(&source)
        .await;

        mount_listing(
            &destination,
            "groups/20/projects",
            vec![vec![project_json(101, "A", "G2"), project_json(102, "B", "G2")]],
        )
        .await;
        post_mock("projects/101/variables", variable_json("A_TOKEN", "a"), 201)
            .expect(1)
            .mount(&destination)
            .await;
        post_any_mock("projects/102/variables", 201)
            .expect(0)
            .mount(&destination)
            .await;

        let (source_provider, destination_provider) = (provider(&source), provider(&destination));
        let mode = MigrationMode::select(Some("10"), None, Some("20"), None, true).unwrap();

        let (export, summary) = Migrator::new(&source_provider, &destination_provider)
            .migrate(&mode)
            .await
            .unwrap();

        assert_eq!(export.variable_count(), 1);
        assert_eq!(summary.created(), 1);
        assert!(summary.skipped_projects.is_empty());
        assert_eq!(summary.unreadable_projects.len(), 1);
        assert_eq!(summary.unreadable_projects[0].source_id, "2");
        assert_eq!(summary.unreadable_projects[0].project_name, "B");
        assert!(summary.unreadable_projects[0].reason.contains("403"));

        source.verify().await;
        destination.verify().await;
    }

    #[tokio::test]
    async fn missing_destination_group_is_fatal() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        mount_listing(
            &source,
            "groups/10/projects",
            vec![vec![project_json(1, "A", "G")]],
        )
        .await;
        mount_listing(
            &source,
            "projects/1/variables",
            vec![vec![variable_json("A_TOKEN", "a")]],
        )
        .await;

        let (source_provider, destination_provider) = (provider(&source), provider(&destination));
        let mode = MigrationMode::select(Some("10"), None, Some("404"), None, true).unwrap();

        let result = Migrator::new(&source_provider, &destination_provider)
            .migrate(&mode)
            .await;

        assert!(result.is_err());
    }
}

mod snapshot {
    use super::*;

    #[tokio::test]
    async fn records_replay_unchanged() {
        let source = MockServer::start().await;
        let destination = MockServer::start().await;

        let stored = json!({
            "variable_type": "file",
            "key": "CONFIG",
            "value": "line1\nline2 \"quoted\" ünïcode",
            "protected": true,
            "masked": false,
            "raw": true,
            "environment_scope": "production/*",
            "description": null,
            "x_custom": { "nested": [1, 2.5, "three"] },
        });

        mount_listing(&source, "projects/5/variables", vec![vec![stored.clone()]]).await;
        post_mock("projects/6/variables", stored.clone(), 201)
            .expect(1)
            .mount(&destination)
            .await;

        let (source_provider, destination_provider) = (provider(&source), provider(&destination));
        let migrator = Migrator::new(&source_provider, &destination_provider);
        let mode = MigrationMode::select(None, Some("5"), None, Some("6"), false).unwrap();

        let exported = migrator.export(&mode.scope()).await.unwrap().variables;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("s-gitlab_get_variables_p-5.json");
        save_output(&exported, &file).unwrap();
        let restored = read_input(&file).unwrap();
        assert_eq!(restored, exported);

        let written = std::fs::read_to_string(&file).unwrap();
        let key_at = written.find("\"key\"").unwrap();
        let custom_at = written.find("\"x_custom\"").unwrap();
        assert!(key_at < custom_at);

        let summary = migrator.apply(&mode.target(), &restored).await.unwrap();

        assert_eq!(summary.created(), 1);
        destination.verify().await;
    }
}
