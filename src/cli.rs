// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Ordered stack deployment with tag-persisted progress tracking")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Normal)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Normal,
    Quiet,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new strata.yml configuration file
    Init {
        /// Project name to scaffold with
        #[arg(short, long)]
        project: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Apply outstanding templates to an environment
    Apply {
        /// Target environment
        env: String,

        /// Build qualifier appended to stack names and tags
        #[arg(long)]
        build: Option<u32>,

        /// Free-text comment tag applied to created stacks
        #[arg(long)]
        comment: Option<String>,

        /// Template directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Delete applied stacks in reverse order and wind the watermark back
    Rollback {
        /// Target environment
        env: String,

        /// Build qualifier the stacks were created with
        #[arg(long)]
        build: Option<u32>,

        /// Template directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Undo only the most recently applied template
    StepBack {
        /// Target environment
        env: String,

        /// Build qualifier the stacks were created with
        #[arg(long)]
        build: Option<u32>,

        /// Template directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Reset the environment's watermark to zero
    ResetIndex {
        /// Target environment
        env: String,
    },

    /// Show the watermark and the stacks owned by an environment
    Status {
        /// Target environment
        env: String,
    },
}
