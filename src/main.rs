//! iOS Trace Studio CLI
//!
//! Records xctrace sessions and summarizes trace bundles.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use ios_trace_studio::commands::{
    display_templates, display_version, execute_analyze, execute_cleanup, execute_serve,
    validate_analysis_file, validate_args, AnalyzeArgs,
};
use ios_trace_studio::utils::config::{ProfilerConfig, DEFAULT_XCRUN};

/// iOS Trace Studio - profiling sessions and trace analysis for iOS apps
#[derive(Parser, Debug)]
#[command(name = "ios-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path or name of the xcrun binary
    #[arg(long, global = true, env = "IOS_TRACE_XCRUN", default_value = DEFAULT_XCRUN)]
    xcrun: PathBuf,

    /// Directory holding one subdirectory per session
    #[arg(long, global = true, env = "IOS_TRACE_ROOT")]
    trace_root: Option<PathBuf>,

    /// Seconds to wait for a stopped trace to finalize
    #[arg(long, global = true, env = "IOS_TRACE_FINALIZE_TIMEOUT")]
    finalize_timeout_secs: Option<u64>,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve start/stop/analyze tool calls as JSON lines on stdin/stdout
    Serve,

    /// Analyze an existing trace bundle
    Analyze {
        /// Trace bundle to analyze
        #[arg(short, long)]
        trace: PathBuf,

        /// Template to analyze (repeatable; default: all)
        #[arg(long = "template")]
        templates: Vec<String>,

        /// Output path for the JSON result
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a saved analysis JSON file
    Validate {
        /// Path to analysis JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove trace directories older than the TTL
    Cleanup {
        /// Override the 24 hour TTL
        #[arg(long)]
        ttl_hours: Option<u64>,
    },

    /// List template aliases
    Templates,

    /// Display version information
    Version,
}

impl Cli {
    fn profiler_config(&self) -> ProfilerConfig {
        let mut config = ProfilerConfig::new().with_xcrun(self.xcrun.clone());
        if let Some(root) = &self.trace_root {
            config = config.with_trace_root(root.clone());
        }
        if let Some(secs) = self.finalize_timeout_secs {
            config = config.with_finalize_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the tool loop
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let config = cli.profiler_config();

    match cli.command {
        Commands::Serve => {
            execute_serve(config).await?;
        }

        Commands::Analyze {
            trace,
            templates,
            output,
            summary,
        } => {
            let args = AnalyzeArgs {
                trace_path: trace,
                templates,
                output_json: output,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_analyze(config, args).await?;
        }

        Commands::Validate { file } => {
            validate_analysis_file(file)?;
        }

        Commands::Cleanup { ttl_hours } => {
            execute_cleanup(&config, ttl_hours)?;
        }

        Commands::Templates => {
            display_templates();
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
