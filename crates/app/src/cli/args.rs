pub use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "drivescan")]
#[command(about = "Crawl a remote drive, enrich every file with hash and label, export the inventory")]
pub struct Args {
    /// Log at debug level (RUST_LOG overrides this)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
