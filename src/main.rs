#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::Result;
use clap::Parser;
use crawl_admission::Config;
use std::sync::Arc;
use tracing_subscriber::FmtSubscriber;

mod app;
mod cli;

use cli::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.observability.level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    app::dispatch::dispatch(cli, Arc::new(config)).await
}
