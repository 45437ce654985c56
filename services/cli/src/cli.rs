use crate::commands::{run_evaluate, run_optimize, EvaluateArgs, OptimizeArgs};
use clap::{Parser, Subcommand};
use supplement_optimizer::config::AppConfig;
use supplement_optimizer::error::AppError;
use supplement_optimizer::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "supplement-optimizer",
    about = "Rank safe supplement combinations and measure recommendation accuracy",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the optimization engine and emit output, trace logs, and runtime logs
    Optimize(OptimizeArgs),
    /// Score the reference scenario against its expected recommendations
    Evaluate(EvaluateArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    tracing::debug!(environment = ?config.environment, "configuration loaded");

    match cli.command {
        Command::Optimize(args) => run_optimize(args, &config),
        Command::Evaluate(args) => run_evaluate(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_optimize_overrides() {
        let cli = Cli::try_parse_from([
            "supplement-optimizer",
            "optimize",
            "--combo-size",
            "3",
            "--weights",
            "0.5,0.3,0.2",
            "--generated-at",
            "2026-02-14T09:31:00.000Z",
        ])
        .expect("optimize arguments parse");

        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize command");
        };
        assert_eq!(args.combo_size, Some(3));
        assert_eq!(args.weights.map(|weights| weights.risk), Some(0.3));
        assert_eq!(args.generated_at.as_deref(), Some("2026-02-14T09:31:00.000Z"));
        assert!(args.input.is_none());
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let err = Cli::try_parse_from([
            "supplement-optimizer",
            "optimize",
            "--weights",
            "0.5,0.5,0.5",
        ])
        .expect_err("weights must be rejected");
        assert!(err.to_string().contains("--weights"));
    }

    #[test]
    fn rejects_zero_case_count() {
        assert!(Cli::try_parse_from(["supplement-optimizer", "evaluate", "--cases", "0"]).is_err());
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["supplement-optimizer"]).is_err());
    }
}
