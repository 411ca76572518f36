use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use repochat::api::AnalysisBackend;
use repochat::api::http::HttpBackend;
use repochat::config::Config;
use repochat::controller::{Completion, QueryController};
use repochat::notify::{ConsoleNotifier, Notifier};
use repochat::repl::{Repl, spawn_stdin_reader};
use repochat::view::TerminalView;

#[derive(Parser)]
#[command(name = "repochat", version, about = "Ask natural-language questions about a Git repository")]
struct Cli {
    /// Path to the JSON config file (default: ./repochat.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Analysis endpoint URL, overrides the config file
    #[arg(long, global = true, env = "REPOCHAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the result
    Ask {
        /// Repository URL (falls back to default_repo_url from config)
        #[arg(long)]
        repo: Option<String>,

        /// Show every context body instead of collapsed rows
        #[arg(long)]
        expand: bool,

        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Interactive session
    Repl {
        #[arg(long)]
        repo: Option<String>,
    },
    /// Check that the analysis backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(config.display.color));
    let view = TerminalView::from_config(&config.display);

    match cli.command {
        Commands::Ask {
            repo,
            expand,
            query,
        } => {
            let repo = repo.or_else(|| config.default_repo_url.clone()).unwrap_or_default();
            ask(backend.as_ref(), notifier.as_ref(), &view, repo, query.join(" "), expand).await
        }
        Commands::Repl { repo } => {
            let repo = repo.or_else(|| config.default_repo_url.clone()).unwrap_or_default();
            tracing::info!(endpoint = %backend.endpoint(), "starting interactive session");
            eprintln!("repochat {}: type :help for commands", repochat::config::CURRENT_VERSION);

            let mut repl = Repl::new(QueryController::with_repo_url(repo), backend, notifier, view);
            let input = spawn_stdin_reader();
            let mut stdout = std::io::stdout();
            repl.run(input, &mut stdout).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => health(backend.as_ref()).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "repochat=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref().unwrap_or(""))?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
    if cli.no_color {
        config.display.color = false;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn ask<B: AnalysisBackend>(
    backend: &B,
    notifier: &dyn Notifier,
    view: &TerminalView,
    repo: String,
    query: String,
    expand: bool,
) -> Result<ExitCode> {
    let mut controller = QueryController::with_repo_url(repo);
    controller.set_query(query);
    if let Err(e) = controller.check_submit() {
        eprintln!("nothing to submit: {e}");
        return Ok(ExitCode::from(2));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .context("invalid spinner template")?,
    );
    spinner.set_message("Analyzing...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let completion = controller.submit(backend, notifier).await;
    spinner.finish_and_clear();

    match completion? {
        Completion::Resolved { .. } => {
            if let Some(tree) = controller.result_mut() {
                if expand {
                    tree.expand_all();
                }
            }
            if let Some(tree) = controller.result() {
                print!("{}", view.render(tree));
            }
            Ok(ExitCode::SUCCESS)
        }
        Completion::Failed { .. } | Completion::Stale => Ok(ExitCode::FAILURE),
    }
}

async fn health<B: AnalysisBackend>(backend: &B) -> Result<ExitCode> {
    match backend.health().await {
        Ok(status) => {
            let version = status.version.as_deref().unwrap_or("unknown");
            let at = status
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!("status: {} (version {version}, at {at})", status.status);
            Ok(if status.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            eprintln!("backend unreachable: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
