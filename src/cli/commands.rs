use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use super::{
    parser::parse_config, reader, Args, Command, GetCommand, MigrateCommand, MirrorArgs,
    OutputArgs, SetCommand, Side, TransferArgs,
};
use crate::{
    credentials::{CredentialProvider, MirrorCredentials, PromptingCredentials, StaticCredentials},
    gitlab_provider::GitlabProvider,
    http::{build_client, ClientConfig},
    error::MigrationError,
    migrator::{
        export_variables, MigrationMode, MigrationSummary, Migrator, SourceExport, VariableScope,
    },
    mirror::Mirrorer,
    provider::{Provider, Target},
    snapshot::{output_file_name, read_input, save_output, SnapshotKind},
    transfer::TransferOptions,
};

struct Session {
    config_path: PathBuf,
    raw_config: reader::Config,
    mirror_credentials: Option<MirrorCredentials>,
    source: GitlabProvider,
    destination: GitlabProvider,
}

impl Session {
    fn provider(&self, side: Side) -> &GitlabProvider {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }
}

pub async fn run(args: Args) -> Result<()> {
    let session = open_session(&args)?;

    match args.command {
        Command::Get(command) => get(&session, command).await,
        Command::Set(command) => set(&session, command).await,
        Command::Migrate(command) => migrate(&session, command).await,
        Command::Mirror(mirror_args) => mirror(&session, mirror_args).await,
    }
}

fn open_session(args: &Args) -> Result<Session> {
    let config_path = reader::resolve_config_path(args.config.clone())?;
    let raw_config = reader::load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let config = parse_config(&raw_config).context("invalid configuration")?;

    let client = build_client(&ClientConfig {
        timeout: Duration::from_secs(args.timeout),
        skip_tls_verification: args.insecure,
        ..ClientConfig::default()
    })?;

    Ok(Session {
        config_path,
        mirror_credentials: config.mirror_credentials,
        source: GitlabProvider::new(config.source, client.clone()),
        destination: GitlabProvider::new(config.destination, client),
        raw_config,
    })
}

async fn get(session: &Session, command: GetCommand) -> Result<()> {
    match command {
        GetCommand::Groups { output } => {
            let groups = session.provider(output.side()).list_groups().await?;
            write_snapshot(&groups, &output, &SnapshotKind::Groups)
        }
        GetCommand::Projects { group, output } => {
            let provider = session.provider(output.side());
            let projects = match &group {
                Some(group) => provider.list_group_projects(group, false).await?,
                None => provider.list_projects().await?,
            };
            write_snapshot(&projects, &output, &SnapshotKind::Projects { group })
        }
        GetCommand::Variables {
            group,
            project,
            recursive,
            output,
        } => {
            let (scope, kind) = variables_selection(group, project, recursive)?;

            let export = export_variables(session.provider(output.side()), &scope).await?;
            if !export.unreadable.is_empty() {
                tracing::warn!(
                    "{} project(s) left out of the export, their variables could not be read",
                    export.unreadable.len()
                );
            }
            write_snapshot(&export.variables, &output, &kind)
        }
    }
}

fn variables_selection(
    group: Option<String>,
    project: Option<String>,
    recursive: bool,
) -> Result<(VariableScope, SnapshotKind), MigrationError> {
    match (group, project) {
        (Some(_), Some(_)) => Err(MigrationError::Selection(
            "give either a group or a project, not both".to_string(),
        )),
        (Some(group), None) => Ok((
            if recursive {
                VariableScope::GroupProjects(group.clone())
            } else {
                VariableScope::Group(group.clone())
            },
            SnapshotKind::GroupVariables { group, recursive },
        )),
        (None, Some(_)) if recursive => Err(MigrationError::Selection(
            "recursive mode is not supported for individual projects".to_string(),
        )),
        (None, Some(project)) => Ok((
            VariableScope::Project(project.clone()),
            SnapshotKind::ProjectVariables { project },
        )),
        (None, None) => Err(MigrationError::Selection(
            "either --group or --project must be provided".to_string(),
        )),
    }
}

fn write_snapshot<T: serde::Serialize + ?Sized>(
    data: &T,
    output: &OutputArgs,
    kind: &SnapshotKind,
) -> Result<()> {
    let path = output
        .output
        .clone()
        .unwrap_or_else(|| output_file_name(kind, output.side()));

    save_output(data, &path)?;
    Ok(())
}

async fn set(session: &Session, command: SetCommand) -> Result<()> {
    let SetCommand::Variables {
        input,
        destination_project,
        destination_group,
        source,
        transfer,
    } = command;

    let target = match (destination_group, destination_project) {
        (Some(group), None) => Target::Group(group),
        (None, Some(project)) => Target::Project(project),
        _ => bail!("either --destination-project or --destination-group must be provided"),
    };

    let export = read_input(&input)?;
    let side = if source {
        Side::Source
    } else {
        Side::Destination
    };

    // Both ends are the chosen instance: nothing is read from the other one.
    let provider = session.provider(side);
    let summary = configure(Migrator::new(provider, provider), &transfer)
        .apply(&target, &export)
        .await?;

    report(&summary);
    Ok(())
}

async fn migrate(session: &Session, command: MigrateCommand) -> Result<()> {
    let MigrateCommand::Variables {
        group,
        project,
        recursive,
        destination_group,
        destination_project,
        transfer,
    } = command;

    let mode = MigrationMode::select(
        group.as_deref(),
        project.as_deref(),
        destination_group.as_deref(),
        destination_project.as_deref(),
        recursive,
    )?;
    let migrator = configure(Migrator::new(&session.source, &session.destination), &transfer);

    let SourceExport {
        variables: export,
        unreadable,
    } = migrator.export(&mode.scope()).await?;
    save_output(&export, &source_snapshot_path(&mode))?;

    tracing::info!(
        "migrating {} variable(s) from {} to {}",
        export.variable_count(),
        session.source.base_url(),
        session.destination.base_url()
    );
    let mut summary = migrator.apply(&mode.target(), &export).await?;
    summary.unreadable_projects = unreadable;

    report(&summary);
    Ok(())
}

fn configure<'a>(
    migrator: Migrator<'a, GitlabProvider>,
    transfer: &TransferArgs,
) -> Migrator<'a, GitlabProvider> {
    migrator
        .with_policy(transfer.matching.into())
        .with_options(TransferOptions {
            skip_existing: transfer.skip_existing,
        })
}

fn source_snapshot_path(mode: &MigrationMode) -> PathBuf {
    let kind = match mode {
        MigrationMode::Project { source, .. } => SnapshotKind::ProjectVariables {
            project: source.clone(),
        },
        MigrationMode::Group { source, .. } => SnapshotKind::GroupVariables {
            group: source.clone(),
            recursive: false,
        },
        MigrationMode::RecursiveGroup { source, .. } => SnapshotKind::GroupVariables {
            group: source.clone(),
            recursive: true,
        },
    };

    output_file_name(&kind, Side::Source)
}

fn report(summary: &MigrationSummary) {
    for report in &summary.reports {
        for failure in report.failures() {
            tracing::warn!(
                "failed: variable {} on {}",
                failure.key.as_deref().unwrap_or("<no key>"),
                report.target
            );
        }
    }

    for project in &summary.unreadable_projects {
        tracing::warn!(
            "skipped: project {} (ID: {}), variables unreadable: {}",
            project.project_name,
            project.source_id,
            project.reason
        );
    }

    tracing::info!(
        "variables migration completed: {} created, {} already present, {} failed, {} project(s) skipped, {} unreadable",
        summary.created(),
        summary.already_present(),
        summary.failed(),
        summary.skipped_projects.len(),
        summary.unreadable_projects.len()
    );
}

async fn mirror(session: &Session, args: MirrorArgs) -> Result<()> {
    let mut credentials = credential_provider(session);
    let mirrorer =
        Mirrorer::new(&session.source, &session.destination).with_policy(args.matching.into());

    match args {
        MirrorArgs {
            source_project: Some(source),
            target_project: Some(target),
            ..
        } => {
            mirrorer
                .mirror_project(&source, &target, credentials.as_mut())
                .await?;
        }
        MirrorArgs {
            source_group: Some(source),
            target_group: Some(target),
            ..
        } => {
            let summary = mirrorer
                .mirror_group(&source, &target, credentials.as_mut())
                .await?;
            tracing::info!(
                "mirroring completed: {} mirrored, {} skipped, {} failed",
                summary.mirrored.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
        }
        _ => {
            return Err(anyhow!(
                "must specify either project IDs (-p, -P) or group IDs (-g, -G)"
            ))
        }
    }

    Ok(())
}

fn credential_provider(session: &Session) -> Box<dyn CredentialProvider> {
    match &session.mirror_credentials {
        Some(credentials) => Box::new(StaticCredentials(credentials.clone())),
        None => Box::new(PromptingCredentials::new(
            session.config_path.clone(),
            session.raw_config.clone(),
        )),
    }
}
