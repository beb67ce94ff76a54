use crate::app::status::{render_catalog, render_status, render_triggers};
use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use chrono::Utc;
use crawl_admission::Config;
use crawl_admission::daemon::{self, build_dispatcher, read_state_file};
use crawl_admission::schedule::default_triggers;
use std::sync::Arc;

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Daemon => daemon::run(config).await,

        Commands::Check => {
            let dispatcher = build_dispatcher(&config)?;
            let state = dispatcher.controller().decide(Utc::now()).await;
            println!("{state}");
            Ok(())
        }

        Commands::Fire { trigger } => {
            let triggers = default_triggers(&config.scheduler);
            let found = triggers
                .iter()
                .find(|t| t.name == trigger)
                .with_context(|| {
                    let known: Vec<_> = triggers.iter().map(|t| t.name).collect();
                    format!("Unknown trigger '{trigger}' (known: {})", known.join(", "))
                })?;
            let dispatcher = build_dispatcher(&config)?;
            match dispatcher.fire(found.action, Utc::now()).await {
                Some(state) => println!("{}: {state}", found.name),
                None => println!("{}: done", found.name),
            }
            Ok(())
        }

        Commands::Catalog => {
            let catalog = config.build_catalog().context("Invalid task catalog")?;
            println!("{}", render_catalog(&catalog, Utc::now()));
            Ok(())
        }

        Commands::Triggers => {
            let offset = config.utc_offset()?;
            let triggers = default_triggers(&config.scheduler);
            println!("{}", render_triggers(&triggers, offset, Utc::now()));
            Ok(())
        }

        Commands::Status => {
            let state = read_state_file(&config.state_file_path()).ok();
            println!("{}", render_status(&config, state.as_ref()));
            Ok(())
        }
    }
}
