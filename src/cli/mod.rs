pub mod commands;
pub mod common;
pub mod parser;
pub mod reader;

pub use commands::run;
pub use common::*;
pub use parser::parse_config;

use std::path::PathBuf;

use clap::{ArgEnum, Parser, Subcommand};

use crate::resolver::MatchPolicy;

#[derive(Parser)]
#[clap(
    name = "gitlab-migrate",
    version,
    about = "Migrate CI/CD variables and mirrors between GitLab instances"
)]
pub struct Args {
    /// Path to the config.yaml file (default: $HOME/config.yaml)
    #[clap(short, long, global = true, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[clap(short = 'k', long, global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[clap(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Retrieve data from GitLab and save it as JSON
    #[clap(subcommand)]
    Get(GetCommand),
    /// Create data in GitLab from a JSON input file
    #[clap(subcommand)]
    Set(SetCommand),
    /// Migrate resources from the source to the destination instance
    #[clap(subcommand)]
    Migrate(MigrateCommand),
    /// Make destination projects push mirrors of source projects
    Mirror(MirrorArgs),
}

#[derive(clap::Args)]
pub struct OutputArgs {
    /// Use the destination config instead of the source
    #[clap(short, long)]
    pub destination: bool,

    /// Path to save the output as a JSON file
    #[clap(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    pub fn side(&self) -> Side {
        if self.destination {
            Side::Destination
        } else {
            Side::Source
        }
    }
}

#[derive(Subcommand)]
pub enum GetCommand {
    /// Retrieve GitLab groups
    Groups {
        #[clap(flatten)]
        output: OutputArgs,
    },
    /// Retrieve GitLab projects
    Projects {
        /// The GitLab group ID to retrieve projects for
        #[clap(short, long)]
        group: Option<String>,

        #[clap(flatten)]
        output: OutputArgs,
    },
    /// Retrieve GitLab CI/CD variables
    Variables {
        /// The GitLab group ID to retrieve variables for
        #[clap(short, long, conflicts_with = "project")]
        group: Option<String>,

        /// The GitLab project ID to retrieve variables for
        #[clap(short, long)]
        project: Option<String>,

        /// Retrieve variables of every project in the group (groups only)
        #[clap(short, long)]
        recursive: bool,

        #[clap(flatten)]
        output: OutputArgs,
    },
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchArg {
    Exact,
    Namespaced,
}

impl From<MatchArg> for MatchPolicy {
    fn from(value: MatchArg) -> Self {
        match value {
            MatchArg::Exact => MatchPolicy::ExactName,
            MatchArg::Namespaced => MatchPolicy::NamespacedName,
        }
    }
}

#[derive(clap::Args)]
pub struct TransferArgs {
    /// Skip variables that already exist on the target (same key and scope)
    #[clap(long)]
    pub skip_existing: bool,

    /// How projects are matched across instances
    #[clap(long = "match", arg_enum, default_value = "exact")]
    pub matching: MatchArg,
}

#[derive(Subcommand)]
pub enum SetCommand {
    /// Create variables from an input file
    Variables {
        /// Path to the input JSON file
        #[clap(short, long, parse(from_os_str))]
        input: PathBuf,

        /// The destination project ID to set variables for
        #[clap(short = 'P', long, conflicts_with = "destination-group")]
        destination_project: Option<String>,

        /// The destination group ID to set variables for
        #[clap(short = 'G', long)]
        destination_group: Option<String>,

        /// Write to the source instance instead of the destination
        #[clap(short, long)]
        source: bool,

        #[clap(flatten)]
        transfer: TransferArgs,
    },
}

#[derive(Subcommand)]
pub enum MigrateCommand {
    /// Migrate CI/CD variables between groups or projects
    Variables {
        /// Source group ID
        #[clap(short, long)]
        group: Option<String>,

        /// Source project ID
        #[clap(short, long)]
        project: Option<String>,

        /// Migrate the variables of every project in the group
        #[clap(short, long)]
        recursive: bool,

        /// Destination group ID
        #[clap(short = 'G', long)]
        destination_group: Option<String>,

        /// Destination project ID
        #[clap(short = 'P', long)]
        destination_project: Option<String>,

        #[clap(flatten)]
        transfer: TransferArgs,
    },
}

#[derive(clap::Args)]
pub struct MirrorArgs {
    /// Source project ID
    #[clap(short = 'p', long, requires = "target-project")]
    pub source_project: Option<String>,

    /// Target project ID
    #[clap(short = 'P', long)]
    pub target_project: Option<String>,

    /// Source group ID
    #[clap(short = 'g', long, requires = "target-group", conflicts_with = "source-project")]
    pub source_group: Option<String>,

    /// Target group ID
    #[clap(short = 'G', long)]
    pub target_group: Option<String>,

    /// How projects are matched across instances
    #[clap(long = "match", arg_enum, default_value = "namespaced")]
    pub matching: MatchArg,
}
