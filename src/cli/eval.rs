use clap::Parser;
use std::path::PathBuf;

/// Arguments for the eval command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Evaluate on the host:\n    mlbox eval --model ./mnist --dataset mnist/v1 --handler ./handler\n\n\
                   Run one task in a container:\n    mlbox eval --model mnist/v1 --dataset mnist/v1 --runtime pytorch/v1 --use-docker --type single --step ppl --task-index 0\n\n\
                   Print the container command only:\n    mlbox eval --model mnist/v1 --dataset mnist/v1 --runtime pytorch/v1 --use-docker --gencmd")]
pub struct EvalArgs {
    /// Model reference or extracted model directory
    #[arg(long)]
    pub model: String,

    /// Dataset references (repeatable)
    #[arg(long = "dataset", value_name = "DATASET", required = true)]
    pub datasets: Vec<String>,

    /// Runtime reference or extracted runtime directory
    #[arg(long)]
    pub runtime: Option<String>,

    /// Run the job inside a container
    #[arg(long)]
    pub use_docker: bool,

    /// Print the container command without running it
    #[arg(long, requires = "use_docker")]
    pub gencmd: bool,

    /// Task kind: all or single
    #[arg(long = "type", default_value = "all")]
    pub task_type: String,

    /// Step to run for a single task
    #[arg(long, default_value = "")]
    pub step: String,

    /// Task index to run for a single task
    #[arg(long, default_value_t = 0)]
    pub task_index: u32,

    /// Evaluation handler program for host runs
    #[arg(long, value_name = "PROGRAM", default_value = "mlbox-handler")]
    pub handler: PathBuf,

    /// Project the job belongs to
    #[arg(long, default_value = "self")]
    pub project: String,

    /// Job version (generated when omitted)
    #[arg(long = "job-version", value_name = "VERSION")]
    pub job_version: Option<String>,

    /// Job name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Job description
    #[arg(long, default_value = "")]
    pub desc: String,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_cli_parsing_eval_defaults() {
        let cli = Cli::try_parse_from([
            "mlbox", "eval", "--model", "mnist/v1", "--dataset", "a/v1", "--dataset", "b/v1",
        ])
        .unwrap();
        match cli.command {
            Commands::Eval(args) => {
                assert_eq!(args.datasets, vec!["a/v1", "b/v1"]);
                assert_eq!(args.task_type, "all");
                assert_eq!(args.task_index, 0);
                assert!(!args.use_docker);
                assert!(args.job_version.is_none());
            }
            _ => panic!("Expected Eval command"),
        }
    }

    #[test]
    fn test_cli_eval_requires_dataset() {
        assert!(Cli::try_parse_from(["mlbox", "eval", "--model", "mnist/v1"]).is_err());
    }

    #[test]
    fn test_cli_gencmd_requires_use_docker() {
        assert!(
            Cli::try_parse_from([
                "mlbox", "eval", "--model", "m", "--dataset", "d", "--gencmd"
            ])
            .is_err()
        );
    }
}
