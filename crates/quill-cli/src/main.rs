#![forbid(unsafe_code)]

mod cmd;
mod output;
mod server;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, Reported, report, resolve_output_mode};
use quill_core::ErrorCode;
use quill_core::config::{QuillConfig, resolve_config};
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "quill: lexical, semantic and hybrid search over Shakespeare",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./quill.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Search backend base URL (overrides config and environment).
    #[arg(long, global = true, value_name = "URL")]
    backend_url: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    /// Effective configuration: file, environment, then command-line overrides.
    fn load_config(&self) -> anyhow::Result<QuillConfig> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        let mut config = resolve_config(self.config.as_deref(), &cwd)?;
        if let Some(url) = &self.backend_url {
            config.backend.url.clone_from(url);
        }
        debug!(backend = %config.backend.url, "configuration resolved");
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(next_help_heading = "Server")]
    Serve(cmd::serve::ServeArgs),

    #[command(next_help_heading = "Read")]
    Search(cmd::search::SearchArgs),

    #[command(next_help_heading = "Read")]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    quill completions bash\n\n    # Generate zsh completions\n    quill completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "quill=debug,info"
        } else {
            "quill=info,warn"
        })
    });

    let format = env::var("QUILL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Err(err) if err.is::<Reported>() => {
            debug!("exiting after reported error: {err}");
            process::exit(1)
        }
        other => other,
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            return Err(report(
                output,
                &CliError {
                    message: format!("{err:#}"),
                    suggestion: code.hint().map(str::to_string),
                    error_code: Some(code.to_string()),
                },
            ));
        }
    };

    match &cli.command {
        Commands::Serve(args) => cmd::serve::run_serve(args, &config),
        Commands::Search(args) => cmd::search::run_search(args, &config, output),
        Commands::Show(args) => cmd::show::run_show(args, &config, output),
        Commands::Completions(_) => Ok(()),
    }
}
