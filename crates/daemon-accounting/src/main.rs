use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use daemon_accounting::app::ApplicationBuilder;
use daemon_accounting::config::CheckOwnerKindsArgs;
use daemon_accounting::config::Cli;
use daemon_accounting::config::Commands;
use daemon_accounting::config::DaemonArgs;
use daemon_accounting::OwnerKindRegistry;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
        Commands::CheckOwnerKinds(args) => run_check_owner_kinds(args),
    }
}

async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let _guard = logging::init(daemon_args.log_path.as_ref())?;

    tracing::info!("Starting daemon accounting {}", &**version::VERSION);

    let app = ApplicationBuilder::new(daemon_args).build()?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}

fn run_check_owner_kinds(args: CheckOwnerKindsArgs) -> Result<()> {
    let registry = OwnerKindRegistry::parse(&args.other_daemon_owner_kinds)
        .context("invalid owner kind configuration")?;

    if registry.is_empty() {
        println!("no other-daemon owner kinds configured");
    }
    for kind in registry.iter() {
        println!("{kind}");
    }
    Ok(())
}
