use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "edb",
    about = "Engineering Database: a temporal object store with stages and time travel",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding the stage manifest and journals [default: .edb]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file; `--data-dir` overrides its `data_dir`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List stages
    Stages,
    /// Manage stages
    Stage(StageArgs),
    /// Insert, update and delete objects in one commit
    Commit(CommitArgs),
    /// Show one object, currently or at a point in time
    Get(GetArgs),
    /// Show every object visible at a point in time
    Head(HeadArgs),
    /// Show the versions of an object
    History(RangeArgs),
    /// Show insert/update/delete records of an object
    Log(RangeArgs),
    /// Find objects by entry values
    Query(QueryArgs),
    /// Compare two points in time, optionally across stages
    Diff(DiffArgs),
    /// List commits
    Commits(CommitsArgs),
    /// List objects that were deleted and inserted again
    Resurrected(StageOpt),
    /// Verify the revision chain of a stage
    Verify(StageOpt),
}

/// Target stage; root when omitted.
#[derive(Args, Clone, Debug, Default)]
pub struct StageOpt {
    #[arg(short, long)]
    pub stage: Option<String>,
}

#[derive(Args)]
pub struct StageArgs {
    #[command(subcommand)]
    pub action: StageAction,
}

#[derive(Subcommand)]
pub enum StageAction {
    /// Create an empty stage
    Create {
        id: String,
        #[arg(long, default_value = "edb")]
        creator: String,
    },
}

#[derive(Args)]
pub struct CommitArgs {
    #[command(flatten)]
    pub stage: StageOpt,
    #[arg(short, long, default_value = "edb")]
    pub committer: String,
    #[arg(long)]
    pub context: Option<String>,
    #[arg(short = 'm', long)]
    pub comment: Option<String>,
    /// `OID:key=value,key=value`
    #[arg(long, value_name = "OBJECT")]
    pub insert: Vec<String>,
    /// `OID:key=value,...`; entries are merged onto the current version
    #[arg(long, value_name = "OBJECT")]
    pub update: Vec<String>,
    #[arg(long, value_name = "OID")]
    pub delete: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub oid: String,
    #[command(flatten)]
    pub stage: StageOpt,
    /// Milliseconds since the epoch or an RFC 3339 date-time
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args)]
pub struct HeadArgs {
    #[command(flatten)]
    pub stage: StageOpt,
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args)]
pub struct RangeArgs {
    pub oid: String,
    #[command(flatten)]
    pub stage: StageOpt,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// `key:value (and key:value)*`
    pub query: String,
    #[command(flatten)]
    pub stage: StageOpt,
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub from: String,
    pub to: String,
    /// Stage read at `from`
    #[arg(long)]
    pub from_stage: Option<String>,
    /// Stage read at `to`
    #[arg(long)]
    pub to_stage: Option<String>,
}

#[derive(Args)]
pub struct CommitsArgs {
    #[command(flatten)]
    pub stage: StageOpt,
    #[arg(long)]
    pub committer: Option<String>,
    #[arg(long)]
    pub context: Option<String>,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}
