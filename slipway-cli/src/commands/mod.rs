//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod init;
mod release;

pub use init::InitCommands;
pub use release::RunArgs;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the semantic version derived from a ref name
    Semver {
        /// Branch or tag name (e.g. v1.2.3)
        ref_name: String,
    },
    /// Load and validate a release definition
    Validate {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Show what a run would build, tag, extract and upload
    Plan {
        #[command(flatten)]
        args: RunArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute a release run
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Build and tag images locally without pushing
        #[arg(long)]
        no_push: bool,

        /// Maximum number of concurrent units per stage
        #[arg(short = 'j', long, env = "SLIPWAY_MAX_PARALLEL", default_value = "4")]
        max_parallel: usize,

        /// Write a JSON run report to this path
        #[arg(long, env = "SLIPWAY_REPORT")]
        report: Option<PathBuf>,
    },
    /// Initialize development environment
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Semver { ref_name } => {
            release::print_semver(&ref_name);
            Ok(())
        }
        Commands::Validate { args } => release::validate(&args),
        Commands::Plan { args, json } => release::plan(&args, json),
        Commands::Run {
            args,
            no_push,
            max_parallel,
            report,
        } => release::run(&args, !no_push, max_parallel, report).await,
        Commands::Init { command } => init::handle_init_command(command).await,
    }
}
