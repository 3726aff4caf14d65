mod cli;
mod commands;
mod error_fmt;
mod logging;

use clap::Parser;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{ConfigInvalid, exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> Result<()> {
    let loaded = hydro_config::load_file(&cli.config)
        .wrap_err_with(|| ConfigInvalid(cli.config.clone()));
    // Console logging comes up even when the config is broken so the
    // failure can be reported; the file sink needs a valid [logging].
    logging::init_tracing(
        cli.json,
        &cli.log_level,
        loaded.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = loaded?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            cycles,
            telemetry_file,
        } => {
            let summary = commands::run_controller(
                &cfg,
                cycles,
                telemetry_file.as_deref(),
                &cli.status_file,
            )?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "cycles": summary.cycles,
                        "published": summary.published,
                        "skipped": summary.skipped,
                        "doses_completed": summary.doses_completed,
                        "sensor_faults": summary.sensor_faults,
                    })
                );
            } else {
                eprintln!(
                    "run complete: {} cycles, {} published, {} skipped, {} doses",
                    summary.cycles, summary.published, summary.skipped, summary.doses_completed
                );
            }
        }
        Commands::Snapshot => {
            let record = commands::snapshot(&cli.status_file)?;
            println!("{record}");
        }
        Commands::SelfCheck => {
            commands::self_check(&cfg)?;
            println!("OK");
        }
        Commands::Health => {
            let status = commands::health(&cli.status_file)?;
            println!("{status}");
        }
    }
    Ok(())
}
