use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pbx_types::Direction;

#[derive(Parser)]
#[command(
    name = "pbx",
    about = "Postbox -- mailboxes and pop-once queues on a shared filesystem",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Org registry file [default: $PBX_CONFIG or ~/.pbx/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage registered orgs
    Org(OrgArgs),
    /// Write or read an object local to the org root
    Local(LocalArgs),
    /// Write an object addressed to a party
    Send(SendArgs),
    /// Read an object addressed to a party
    Get(GetArgs),
    /// Append an entry to a queue
    Push(PushArgs),
    /// Take the oldest entry from a queue
    Pop(PopArgs),
    /// Count the entries waiting in a queue
    Size(SizeArgs),
}

#[derive(Args)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub action: OrgAction,
}

#[derive(Subcommand)]
pub enum OrgAction {
    /// Register an org, replacing one with the same name
    Add { name: String, path: PathBuf },
    /// Forget an org; its files are left alone
    Rm { name: String },
    /// List registered orgs
    Ls,
}

#[derive(Args)]
pub struct LocalArgs {
    #[command(subcommand)]
    pub action: LocalAction,
}

#[derive(Subcommand)]
pub enum LocalAction {
    Write {
        #[arg(long)]
        org: String,
        name: String,
        /// Read from stdin when omitted
        content: Option<String>,
    },
    Read {
        #[arg(long)]
        org: String,
        name: String,
    },
}

#[derive(Args)]
pub struct SendArgs {
    #[arg(long)]
    pub org: String,
    /// Owner-only tier instead of the world-readable one
    #[arg(long)]
    pub private: bool,
    pub to: String,
    pub name: String,
    /// Read from stdin when omitted
    pub content: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    #[arg(long)]
    pub org: String,
    #[arg(long)]
    pub private: bool,
    pub from: String,
    pub name: String,
}

#[derive(Args)]
pub struct PushArgs {
    #[arg(long)]
    pub org: String,
    /// Act as this party
    #[arg(long = "as", value_name = "ID")]
    pub as_id: Option<String>,
    /// Deliver to this party's incoming queue
    #[arg(long, value_name = "ID", required_unless_present = "outgoing", conflicts_with = "outgoing")]
    pub to: Option<String>,
    /// Deposit in our own outgoing queue (needs --as)
    #[arg(long, requires = "as_id")]
    pub outgoing: bool,
    pub queue: String,
    /// Read from stdin when omitted
    pub content: Option<String>,
}

#[derive(Args)]
pub struct PopArgs {
    #[arg(long)]
    pub org: String,
    #[arg(long = "as", value_name = "ID")]
    pub as_id: Option<String>,
    /// Drain our own incoming queue (needs --as)
    #[arg(long, required_unless_present = "from", conflicts_with = "from", requires = "as_id")]
    pub incoming: bool,
    /// Drain this party's outgoing queue
    #[arg(long, value_name = "ID")]
    pub from: Option<String>,
    pub queue: String,
}

#[derive(Args)]
pub struct SizeArgs {
    #[arg(long)]
    pub org: String,
    pub id: String,
    /// incoming or outgoing
    pub direction: Direction,
    pub queue: String,
}
