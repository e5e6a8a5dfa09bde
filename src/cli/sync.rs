use clap::Parser;
use std::path::PathBuf;

/// Arguments shared by the upload and download commands
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Upload a dataset version:\n    mlbox upload mnist/gq4wmmrrgezd --remote /mnt/shared\n\n\
                   Download into another project:\n    mlbox download mnist/gq4wmmrrgezd --remote /mnt/shared --project team")]
pub struct SyncArgs {
    /// Bundle as <name>/<version>
    pub bundle: String,

    /// Remote store directory
    #[arg(long, value_name = "DIR")]
    pub remote: PathBuf,

    /// Local project
    #[arg(long, default_value = "self")]
    pub project: String,

    /// Project on the remote side (defaults to the local project)
    #[arg(long, value_name = "PROJECT")]
    pub remote_project: Option<String>,

    /// Remote instance name used for row storage (defaults to the remote directory)
    #[arg(long, value_name = "URI")]
    pub remote_instance: Option<String>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_cli_parsing_upload() {
        let cli =
            Cli::try_parse_from(["mlbox", "upload", "mnist/v1", "--remote", "/mnt/shared"]).unwrap();
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.bundle, "mnist/v1");
                assert_eq!(args.project, "self");
                assert!(args.remote_project.is_none());
            }
            _ => panic!("Expected Upload command"),
        }
    }

    #[test]
    fn test_cli_download_requires_remote() {
        assert!(Cli::try_parse_from(["mlbox", "download", "mnist/v1"]).is_err());
    }
}
