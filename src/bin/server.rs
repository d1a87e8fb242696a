//! `hl-server`: the background daemon process. Always runs in the
//! foreground from its own perspective — `hl server start` is what detaches
//! it (see [`hlmirrord::daemon::lifecycle::start_detached`]).

use clap::Parser;

use hlmirrord::daemon::lifecycle::init_foreground_logging;
use hlmirrord::paths;

#[derive(Parser, Debug)]
#[command(name = "hl-server")]
struct Args {
    /// Target testnet instead of mainnet.
    #[arg(long, default_value_t = false)]
    testnet: bool,
}

fn main() {
    let log_path = paths::server_log_path().expect("failed to resolve server.log path");
    // Held until main exits: dropping it flushes and closes server.log, the
    // last step of the daemon's teardown sequence.
    let _log_guard = init_foreground_logging(&log_path).expect("failed to initialize logging");

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    if let Err(e) = runtime.block_on(hlmirrord::daemon::run_foreground(args.testnet)) {
        tracing::error!(error = %e, "daemon exited with error");
        std::process::exit(1);
    }
}
