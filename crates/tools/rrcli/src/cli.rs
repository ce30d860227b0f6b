use clap::{Parser, Subcommand};
use rr_models::{ProjectId, RunId, ScriptId};

#[derive(Parser)]
#[command(name = "rrcli")]
#[command(about = "RR - Generate and browse run reports")]
pub struct Cli {
    /// Base URL of the RR daemon API
    #[arg(short, long, default_value = "http://127.0.0.1:3000/v1")]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the report of a script's latest run, running the script if it never ran
    Script {
        /// Script id
        #[arg(long)]
        script_id: ScriptId,

        /// Only consider runs of this project
        #[arg(long)]
        project_id: Option<ProjectId>,
    },

    /// Generate the report of a run
    Run {
        /// Run id
        #[arg(long)]
        run_id: RunId,
    },

    /// Print the report URL of a run
    Url {
        /// Run id
        #[arg(long)]
        run_id: RunId,
    },

    /// List generated reports
    List {
        /// Only list reports of this project
        #[arg(long)]
        project_id: Option<ProjectId>,
    },

    /// Remove old report artifacts
    Cleanup {
        /// Artifacts older than this many days are removed
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn parses_script_command() {
        let script_id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["rrcli", "script", "--script-id", &script_id.to_string()])
            .expect("valid arguments");
        assert_eq!(cli.server, "http://127.0.0.1:3000/v1");
        assert!(matches!(
            cli.command,
            Commands::Script { script_id: id, project_id: None } if id == script_id
        ));
    }

    #[test]
    fn cleanup_defaults_to_thirty_days() {
        let cli = Cli::try_parse_from(["rrcli", "--server", "http://rr:3000/v1", "cleanup"])
            .expect("valid arguments");
        assert!(matches!(cli.command, Commands::Cleanup { days: 30 }));
    }

    #[test]
    fn binary_name_matches_the_package() {
        assert_eq!(Cli::command().get_name(), "rrcli");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(Cli::try_parse_from(["rrcli", "url", "--run-id", "not-a-uuid"]).is_err());
    }
}
