use clap::{CommandFactory, Parser};
use csv_refinery::core::{commands, report};
use csv_refinery::utils::logger;
use csv_refinery::{CliConfig, Command, EtlError, ResolvedConfig};
use std::io::Write;

fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let Some(command) = cli.command.clone() else {
        let _ = CliConfig::command().print_help();
        return;
    };

    if let Err(e) = run(&cli, command) {
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            env!("CARGO_PKG_NAME"),
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }
}

fn run(cli: &CliConfig, command: Command) -> Result<(), EtlError> {
    let config = ResolvedConfig::load(&cli.config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io = |e: std::io::Error| EtlError::io("<stdout>", e);

    match command {
        Command::Clean {
            input,
            output,
            json,
        } => {
            let config = config
                .with_input_override(input)
                .with_output_override(output);
            let summary = commands::clean(&config)?;
            if json {
                report::write_summary_json(&mut out, &summary)?;
            } else {
                report::write_summary(&mut out, &summary, &config).map_err(io)?;
                writeln!(out, "✓ Processing completed successfully!").map_err(io)?;
            }
        }
        Command::Preview { rows } => {
            let artifact = report::OutputArtifact::open(&config.output_path)?;
            report::write_preview(&mut out, &artifact, rows).map_err(io)?;
        }
        Command::Stats { column, sample } => {
            let artifact = report::OutputArtifact::open(&config.output_path)?;
            report::write_stats(&mut out, &artifact, column.as_deref(), sample)?;
        }
        Command::Maxid { products, key } => {
            let next = commands::maxid(&config, products, key)?;
            writeln!(out, "✓ Next sequential id will be {}", next).map_err(io)?;
        }
    }

    Ok(())
}
