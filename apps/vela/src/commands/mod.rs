mod backtest;
mod common;
mod paper;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Backtest {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Paper {
        config: PathBuf,
        dry_run: bool,
        user: String,
    },
    Validate {
        config: PathBuf,
        strict: bool,
        out: Option<PathBuf>,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest { config, out } => backtest::run_backtest(config, out),
        Command::Paper {
            config,
            dry_run,
            user,
        } => paper::run_paper(config, dry_run, user),
        Command::Validate {
            config,
            strict,
            out,
        } => validate::run_validate(config, strict, out),
    }
}

/// 2 for a failed strict validation, 3 when the input held no bars.
pub fn exit_code(err: &str) -> i32 {
    if err.starts_with("strict validation failed") {
        2
    } else if err.starts_with("no data") {
        3
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::exit_code;

    #[test]
    fn exit_codes_separate_no_data_from_failures() {
        assert_eq!(exit_code("no data for AAPL in [- .. -]: empty input"), 3);
        assert_eq!(exit_code("strict validation failed: 1 duplicate"), 2);
        assert_eq!(exit_code("simulation failed: timestamps must be strictly increasing"), 1);
    }
}
