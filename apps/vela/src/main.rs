mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vela")]
#[command(about = "Vela backtest engine", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  vela backtest --config configs/sample.toml --out runs/\n  vela paper --config configs/sample.toml --dry-run\n  vela validate --config configs/sample.toml --strict\n"
)]
struct Cli {
    /// Log filter used when VELA_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Simulate the configured strategy and write run artifacts.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        /// Overrides paths.out_dir.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Route the latest decision to the configured broker.
    Paper {
        #[arg(long)]
        config: PathBuf,
        /// Plan the order without sending it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Report data quality for the configured input.
    Validate {
        #[arg(long)]
        config: PathBuf,
        /// Fail on duplicate, out-of-order or invalid rows.
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Also write the report as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_format = match cli.log_format {
        LogFormat::Text => "text",
        LogFormat::Json => "json",
    };
    if let Err(err) = obs::init_tracing(&cli.log_level, log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Backtest { config, out } => Command::Backtest { config, out },
        CliCommand::Paper {
            config,
            dry_run,
            user,
        } => Command::Paper {
            config,
            dry_run,
            user,
        },
        CliCommand::Validate {
            config,
            strict,
            out,
        } => Command::Validate {
            config,
            strict,
            out,
        },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {err}");
        std::process::exit(commands::exit_code(&err));
    }
}
