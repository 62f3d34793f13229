use super::{CipherCommands, Cli, Commands, ConfigCommands, ScheduleCommands};
use crate::cipher::CipherCodec;
use crate::config::Config;
use crate::scheduler::preview;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load_or_init(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => crate::daemon::run(Arc::new(config)).await,
        Commands::Cipher { action } => {
            println!("{}", cipher_output(&config, &action)?);
            Ok(())
        }
        Commands::Schedule {
            action: ScheduleCommands::Preview { count },
        } => {
            for line in schedule_preview(&config, count, Utc::now())? {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Config {
            action: ConfigCommands::Show,
        } => {
            print!("{}", config_show(&config)?);
            Ok(())
        }
    }
}

fn cipher_output(config: &Config, action: &CipherCommands) -> Result<String> {
    let (word, shift, encode) = match action {
        CipherCommands::Encode { word, shift } => (word, shift, true),
        CipherCommands::Decode { word, shift } => (word, shift, false),
    };
    let codec = match shift {
        Some(k) => CipherCodec::new(*k)?,
        None => config.secret.codec()?,
    };
    Ok(if encode {
        codec.encode(word)
    } else {
        codec.decode(word)
    })
}

fn schedule_preview(config: &Config, count: usize, now: DateTime<Utc>) -> Result<Vec<String>> {
    config.validate_behavior()?;
    let policy = config.schedule.policy;

    let mut lines = vec![format!("policy: {policy:?}")];
    if let Some(delay) = config.schedule.initial_delay() {
        lines.push(format!("initial broadcast {}s after start", delay.as_secs()));
    }
    lines.extend(
        preview(policy, now, count, &mut rand::rng())
            .into_iter()
            .enumerate()
            .map(|(i, at)| format!("{:>3}. {}", i + 1, at.format("%Y-%m-%d %H:%M:%S UTC"))),
    );
    Ok(lines)
}

fn config_show(config: &Config) -> Result<String> {
    toml::to_string_pretty(&config.redacted()).context("serialize config")
}
