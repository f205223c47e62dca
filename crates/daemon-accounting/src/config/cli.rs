use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::daemon::DaemonArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon accounting service
    Daemon(Box<DaemonArgs>),
    /// Validate an owner kind list and print the parsed registry
    #[command(name = "check-owner-kinds")]
    CheckOwnerKinds(CheckOwnerKindsArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct CheckOwnerKindsArgs {
    #[arg(
        long,
        env = "OTHER_DAEMON_OWNER_KINDS",
        value_delimiter = ',',
        help = "Comma separated group/version/kind entries to validate"
    )]
    pub other_daemon_owner_kinds: Vec<String>,
}
