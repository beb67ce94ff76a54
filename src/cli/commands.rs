use clap::{Parser, Subcommand};

/// `crawl-admission` - decides when to enqueue new crawl task batches.
#[derive(Parser, Debug)]
#[command(name = "crawl-admission")]
#[command(version)]
#[command(about = "Admission controller for periodic crawl task generation.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every trigger until Ctrl-C
    Daemon,

    /// Evaluate the ASIN admission rules once and act on the result
    Check,

    /// Fire a single trigger now, by name (see `triggers`)
    Fire {
        /// Trigger name, e.g. `asin-watchdog` or `clear-asin-2330`
        trigger: String,
    },

    /// List the task catalog and whether each task is inside its run window
    Catalog,

    /// Show the trigger table with each trigger's next firing
    Triggers,

    /// Show configuration and the last state written by the daemon
    Status,
}
