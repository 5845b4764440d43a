//! update-notifier CLI
//!
//! Watches a deployed site from the terminal: the "page" is the terminal
//! session, the confirmation dialog is a y/N question, and "reloading" ends
//! the watch.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::{Mutex, Notify};
use update_notifier::{
    Notifier, create_notifier,
    error::Result,
    host::{Host, HttpFetcher, Prompt, Reloader},
    models::Config,
    pipeline::{FingerprintExtractor, Phase, resolve},
};

/// update-notifier - detect newly deployed web builds
#[derive(Parser, Debug)]
#[command(name = "update-notifier", version, about = "Detect newly deployed web builds")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "update-notifier.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the site and ask to reload when a new build shows up
    Watch {
        /// Override the base URL from the config file
        #[arg(long)]
        url: Option<String>,

        /// Override the polling interval (milliseconds)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Fingerprint the reference document once and print it as JSON
    Check {
        /// Override the base URL from the config file
        #[arg(long)]
        url: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

type Input = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Line-oriented terminal input, shared by the reload prompt and the manual
/// watch loop so neither loses lines the other has buffered.
#[derive(Clone)]
struct Terminal {
    input: Arc<Mutex<Input>>,
}

impl Terminal {
    fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            input: Arc::new(Mutex::new(reader.lines())),
        }
    }

    /// Next input line, or `None` at end of input.
    async fn read_line(&self) -> Option<String> {
        match self.input.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Could not read from terminal: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Prompt for Terminal {
    async fn confirm(&self, message: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        let question = format!("{message} [y/N] ");
        if stdout.write_all(question.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        self.read_line()
            .await
            .is_some_and(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// "Reloading" ends the watch.
struct ExitReloader {
    done: Arc<Notify>,
}

impl Reloader for ExitReloader {
    fn reload(&self) {
        self.done.notify_one();
    }
}

/// Manual mode: record a baseline, then check again each time the user
/// presses Enter, until end of input or an accepted reload.
async fn watch_manually(notifier: &Notifier, terminal: &Terminal) -> Result<usize> {
    notifier.check_now().await;
    log::info!("Manual mode: baseline recorded, press Enter to check again (Ctrl-D to quit)");

    let mut updates = 0;
    while terminal.read_line().await.is_some() {
        if notifier.check_update().await? {
            updates += 1;
        } else {
            log::info!("No new version");
        }
        if notifier.phase() == Phase::Reloaded {
            break;
        }
    }
    Ok(updates)
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Watch { url, interval } => {
            if let Some(url) = url {
                config.http.base_url = url;
            }
            if let Some(interval) = interval {
                config.notifier.polling_interval = Some(interval);
            }
            config.validate()?;

            let done = Arc::new(Notify::new());
            let terminal = Terminal::stdin();
            let host = Host::new(
                Arc::new(HttpFetcher::new(&config.http)?),
                Arc::new(terminal.clone()),
                Arc::new(ExitReloader {
                    done: Arc::clone(&done),
                }),
            );
            let notifier = create_notifier(config.notifier.clone(), host);

            if notifier.mode().is_manual() {
                let updates = watch_manually(&notifier, &terminal).await?;
                log::info!("Manual watch finished, {} update(s) detected", updates);
                return Ok(());
            }

            // Record the baseline right away instead of waiting one interval.
            notifier.check_now().await;
            notifier.start();
            log::info!(
                "Watching {} every {}ms",
                config.http.base_url,
                notifier.interval().map_or(0, |i| i.as_millis())
            );

            done.notified().await;
            log::info!("New version accepted, stopping watch.");
        }

        Command::Check { url } => {
            if let Some(url) = url {
                config.http.base_url = url;
            }
            config.validate()?;

            let resolved = resolve(&config.notifier);
            let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
            let fingerprint = FingerprintExtractor::new(fetcher, &resolved)
                .extract()
                .await;

            let report = serde_json::json!({
                "url": config.http.base_url,
                "index_path": resolved.index_path,
                "digest": fingerprint.digest(),
                "assets": fingerprint,
            });
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(serde_json::to_string_pretty(&report)?.as_bytes())
                .await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match Config::load(&cli.config) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Could not load {}: {}", cli.config.display(), e);
                    return Err(e);
                }
            };
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let resolved = resolve(&config.notifier);
            log::info!("✓ Config OK");
            log::info!("    Mode: {:?}", resolved.mode);
            log::info!("    Notify type: {:?}", resolved.notify_type);
            log::info!("    Index path: {}", resolved.index_path);
            if resolved.pattern.is_none() {
                log::warn!("    Extraction pattern is unusable; fingerprints will be empty");
            }
        }
    }

    Ok(())
}
