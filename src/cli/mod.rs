pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::codegen::{Componentization, Fidelity, GenerationOptions, Interactivity, OutputFormat, StyleHandling};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Configuration profile to use
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a page and wait for the task to finish
    Capture {
        /// Page URL (http or https)
        #[arg(required = true)]
        url: String,

        /// Ignore any cached capture and fetch the page again
        #[arg(short, long)]
        force: bool,

        /// Do not print progress updates
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the status of a capture task
    Status {
        #[arg(required = true)]
        task_id: Uuid,
    },

    /// Print the capture result of a completed task as JSON
    Result {
        #[arg(required = true)]
        task_id: Uuid,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List known capture tasks
    List,

    /// Delete a capture task record
    Delete {
        #[arg(required = true)]
        task_id: Uuid,
    },

    /// Generate component code from a completed capture
    Generate {
        #[arg(required = true)]
        task_id: Uuid,

        #[command(flatten)]
        options: GenerateArgs,
    },

    /// Show the most recently generated code for a task
    ComponentCode {
        #[arg(required = true)]
        task_id: Uuid,
    },

    /// Render a standalone HTML preview from a task id or a page structure JSON file
    Preview {
        #[arg(required = true)]
        source: String,
    },

    /// Write generated code for a task to disk
    Export {
        #[arg(required = true)]
        task_id: Uuid,

        #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::React)]
        format: OutputFormat,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the capture cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Manage configuration profiles
    Config {
        /// Profile name to show or create
        #[arg(required = false)]
        name: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove expired entries from both cache tiers
    Purge,
}

#[derive(clap::Args)]
struct GenerateArgs {
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::React)]
    format: OutputFormat,

    #[arg(long, value_enum, default_value_t = Fidelity::Medium)]
    fidelity: Fidelity,

    #[arg(long, value_enum, default_value_t = Componentization::PerComponent)]
    componentization: Componentization,

    #[arg(long, value_enum, default_value_t = StyleHandling::Separate)]
    style_handling: StyleHandling,

    #[arg(long, value_enum, default_value_t = Interactivity::Static)]
    interactivity: Interactivity,

    /// Leave out media queries
    #[arg(long)]
    no_responsive: bool,
}

impl From<GenerateArgs> for GenerationOptions {
    fn from(args: GenerateArgs) -> Self {
        Self {
            fidelity: args.fidelity,
            componentization: args.componentization,
            style_handling: args.style_handling,
            interactivity: args.interactivity,
            responsive: !args.no_responsive,
            format: args.format,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    let profile = cli.profile;

    match cli.command {
        Commands::Capture { url, force, quiet } => {
            info!("Capturing {}", url);
            commands::capture(profile, url, force, quiet).await
        }
        Commands::Status { task_id } => commands::status(profile, task_id).await,
        Commands::Result { task_id, output } => commands::result(profile, task_id, output).await,
        Commands::List => commands::list(profile).await,
        Commands::Delete { task_id } => commands::delete(profile, task_id).await,
        Commands::Generate { task_id, options } => {
            info!("Generating {} code for task {}", options.format, task_id);
            commands::generate(profile, task_id, options.into()).await
        }
        Commands::ComponentCode { task_id } => commands::component_code(profile, task_id).await,
        Commands::Preview { source } => commands::preview(profile, source).await,
        Commands::Export { task_id, format, output } => {
            info!("Exporting task {} as {}", task_id, format);
            commands::export(profile, task_id, format, output).await
        }
        Commands::Cache { action: CacheCommands::Purge } => commands::purge_cache(profile).await,
        Commands::Config { name, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles()
            } else if let Some(profile_name) = name {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name)
            } else {
                info!("Showing current configuration");
                commands::show_config(profile)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    #[test]
    fn test_generate_args_map_to_options() {
        let cli = Cli::try_parse_from([
            "recast",
            "generate",
            "8c3f7d8e-6a0b-4c8e-9b1a-2f4d5e6a7b8c",
            "--format",
            "vue",
            "--componentization",
            "single",
            "--no-responsive",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { options, .. } => {
                let options = GenerationOptions::from(options);
                assert_eq!(options.format, OutputFormat::Vue);
                assert_eq!(options.componentization, Componentization::Single);
                assert!(!options.responsive);
            }
            _ => panic!("expected generate"),
        }
    }
}
