use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use envschema_cli::{build_validator, check, read_env, show_schema, EngineChoice, OutputFormat};

#[derive(Parser)]
#[command(name = "envschema")]
#[command(about = "Validate environment variables against a declarative schema", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the current environment against a schema
    Check {
        /// Schema file (JSON, YAML, or Nickel with --engine nickel)
        #[arg(short, long, env = "ENVSCHEMA_SCHEMA")]
        schema: PathBuf,

        /// KEY=VALUE file overlaid on the process environment
        #[arg(short, long)]
        env_file: Option<PathBuf>,

        /// Fail with every error instead of printing a report
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print a schema as resolved JSON
    ShowSchema {
        /// Schema file
        #[arg(short, long, env = "ENVSCHEMA_SCHEMA")]
        schema: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Rule engine
    #[arg(long, value_enum, env = "ENVSCHEMA_ENGINE", default_value_t = EngineChoice::Native)]
    engine: EngineChoice,

    /// Path to the nickel binary (defaults to ENVSCHEMA_NICKEL, then PATH)
    #[arg(long)]
    nickel_binary: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug {
        LevelFilter::TRACE
    } else if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.debug); // Show target module in debug mode
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    match cli.command {
        Commands::Check {
            schema,
            env_file,
            strict,
            format,
            engine,
        } => {
            let validator = build_validator(
                engine.engine.into_kind(engine.nickel_binary),
                cli.verbose,
            )?;
            let env = read_env(env_file.as_deref())?;
            let outcome = check(&validator, &schema, &env)?;
            let rendered = outcome.render(format)?;

            if strict {
                outcome.into_strict()?;
                println!("{}", rendered.trim_end());
                return Ok(ExitCode::SUCCESS);
            }

            println!("{}", rendered.trim_end());
            Ok(if outcome.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::ShowSchema { schema, engine } => {
            let validator =
                build_validator(engine.engine.into_kind(engine.nickel_binary), false)?;
            println!("{}", show_schema(&validator, &schema)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
