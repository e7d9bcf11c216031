//! Legal Compliance Analyzer client (lca) - Main entry point
//!
//! Terminal front end over `lca_client`: log in, upload a contract and show
//! its analysis, list and dismiss notifications, or watch them live.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use lca_client::render::{render_notifications, render_upload_view};
use lca_client::session::{Navigator, Route, SessionGate};
use lca_client::upload::PendingFile;
use lca_client::App;
use lca_common::config::{ClientConfig, ConfigOverrides, LoggingConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for lca
#[derive(Parser, Debug)]
#[command(name = "lca")]
#[command(about = "Legal Compliance Analyzer client")]
#[command(version)]
struct Args {
    /// Path to config.toml
    #[arg(long, global = true, env = "LCA_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the analysis backend
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// File holding the stored credential
    #[arg(long, global = true)]
    credential_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the issued credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LCA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored credential
    Logout,
    /// Show who the stored credential belongs to
    Whoami,
    /// Upload a contract and show its analysis
    Upload {
        /// PDF or DOCX document
        file: PathBuf,
    },
    /// Fetch and list pending notifications
    Notifications,
    /// Dismiss the notification at INDEX (as listed by `notifications`)
    Dismiss { index: usize },
    /// Follow notifications until Ctrl+C or logout; type an index to dismiss
    Watch,
}

/// Terminal stand-in for page navigation
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => eprintln!("Not logged in. Run `lca login --email <EMAIL>`."),
            Route::Home => eprintln!("Ready. Run `lca upload <FILE>` to analyze a contract."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = ClientConfig::resolve(ConfigOverrides {
        config_path: args.config.clone(),
        backend_url: args.backend_url.clone(),
        credential_path: args.credential_path.clone(),
    })
    .context("Failed to resolve configuration")?;

    init_tracing(&config.logging)?;
    info!(backend_url = %config.backend_url, "Starting lca");

    let app = App::new(config).context("Failed to initialize client")?;
    let gate = SessionGate::new(app.session.clone(), Arc::new(ConsoleNavigator));

    match args.command {
        Command::Login { email, password } => {
            let identity = app
                .login(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!(e.display_message()))?;
            println!("Logged in as {}", identity.email);
            ConsoleNavigator.navigate(Route::Home);
            Ok(ExitCode::SUCCESS)
        }

        Command::Logout => {
            gate.logout().context("Failed to clear credential")?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Whoami => {
            match app.session.identity() {
                Some(identity) => println!("{}", identity.email),
                None => println!("Not logged in"),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Upload { file } => {
            if gate.protect(|| ()).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            upload(&app, &file).await
        }

        Command::Notifications => {
            app.notifications.fetch_latest().await;
            print!("{}", render_notifications(&app.notifications.notifications()));
            Ok(ExitCode::SUCCESS)
        }

        Command::Dismiss { index } => {
            app.notifications.fetch_latest().await;
            match app.notifications.dismiss(index) {
                Some(ticket) => {
                    let text = ticket.notification().display_text();
                    if ticket.acknowledged().await {
                        println!("Dismissed: {}", text);
                    } else {
                        println!("Dismissed locally (server did not confirm): {}", text);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No notification at index {}", index);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::Watch => {
            if gate.protect(|| ()).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            watch(&app, gate).await
        }
    }
}

/// Select, submit, print; the poller runs for the duration of the upload
async fn upload(app: &App, path: &Path) -> Result<ExitCode> {
    let poller = app.notifications.start();

    let outcome = match PendingFile::from_path(path).await {
        Ok(file) => {
            app.upload.select_file(file).await;
            println!("Analyzing {} ...", path.display());
            app.upload.submit().await
        }
        Err(e) => Err(e),
    };

    if let Some(task) = poller {
        task.stop().await;
    }

    match outcome {
        Ok(view) => {
            print!("{}", render_upload_view(&view));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.display_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Follow the notification board until Ctrl+C or the session ends
async fn watch(app: &App, mut gate: SessionGate) -> Result<ExitCode> {
    let poller = app.notifications.start();
    let session_watch = app.watch_session();

    let mut updates = Box::pin(app.notifications.updates());
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            authenticated = gate.changed() => {
                if !authenticated {
                    gate.protect(|| ());
                    break;
                }
            }
            Some(list) = updates.next() => {
                print!("{}", render_notifications(&list));
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim().parse::<usize>() {
                        Ok(index) => {
                            if app.notifications.dismiss(index).is_none() {
                                eprintln!("No notification at index {}", index);
                            }
                        }
                        Err(_) => eprintln!("Type a notification index to dismiss it"),
                    },
                    Ok(None) | Err(_) => stdin_open = false,
                }
            }
        }
    }

    if let Some(task) = poller {
        task.stop().await;
    }
    session_watch.stop().await;
    Ok(ExitCode::SUCCESS)
}

/// Install the tracing subscriber
///
/// Filter: `RUST_LOG` if set, else the configured level. Output goes to the
/// configured log file, or stderr so it never mixes with command output.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, stderr_layer) = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
                None,
            )
        }
        None => (None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}
