//! `hl`: the CLI surface for the perp-market mirror daemon. Talks to
//! `hl-server` over the control socket; falls back to direct upstream calls
//! when no daemon is running (see [`hlmirrord::fallback`]).

use clap::Parser;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use hlmirrord::cli::{self, Cli, Commands, ConfigCommands, ServerCommands};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> hlmirrord::error::Result<()> {
    match cli.command {
        Commands::Server(ServerCommands::Start { testnet }) => cli::server::execute_start(testnet, cli.json).await,
        Commands::Server(ServerCommands::Stop) => cli::server::execute_stop(cli.json).await,
        Commands::Server(ServerCommands::Status) => cli::server::execute_status(cli.json).await,
        Commands::Config(ConfigCommands::Set { key, value }) => cli::config::execute_set(&key, &value, cli.json),
        Commands::Config(ConfigCommands::Get { key }) => cli::config::execute_get(&key, cli.json),
        Commands::Config(ConfigCommands::List) => cli::config::execute_list(cli.json),
        Commands::Watch(args) => cli::watch::execute(args.coin, args.testnet, cli.json).await,
        Commands::Prices(args) => cli::prices::execute(args.coin, args.testnet, cli.json).await,
    }
}
