// CLI modules
mod cli;
mod export;
mod process;

use clap::{Parser, Subcommand};

use cli::args::Args;
use cli::op::Op;
use cli::ops::{Scan, Version};

command_enum! {
    (Scan, Scan),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = process::init_tracing(args.verbose);
    process::register_panic_logger();
    process::report_build_info();

    // A stop signal flips the watch; in-flight requests settle and the run
    // aborts cleanly instead of tearing the process down mid-write.
    let (_signal_task, _shutdown_tx, shutdown_rx) = process::graceful_shutdown_blocker();
    let ctx = cli::op::OpContext::new(shutdown_rx);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
