use anyhow::Result;
use clap::{Parser, Subcommand};
use prompt_booster::config::ConfigStore;
use prompt_booster::llm::{ConfiguredCatalog, ModelCatalog};
use prompt_booster::lsp::{self, BoosterParts};
use prompt_booster::state::StateStore;
use prompt_booster::transport;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("PROMPT_BOOSTER_VERSION_SUFFIX")
);

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("PROMPT_BOOSTER_VERSION_SUFFIX"),
    "\ncommit: ",
    env!("PROMPT_BOOSTER_GIT_HASH"),
    "\nbuilt:  ",
    env!("PROMPT_BOOSTER_BUILD_TIME")
);

#[derive(Parser)]
#[command(name = "prompt-booster")]
#[command(author, version = VERSION, long_version = LONG_VERSION)]
#[command(about = "Prompt Booster - rewrite rough prompts into clear, structured ones", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a file (or some of its lines) in place
    Boost {
        /// File to rewrite
        file: String,

        /// Line range to rewrite, 1-based and inclusive (e.g. 3:7)
        #[arg(short, long)]
        lines: Option<String>,
    },

    /// Optimize a prompt using the configured operation mode
    Optimize {
        /// Prompt text
        prompt: Option<String>,

        /// Read the prompt from a file (manual mode rewrites it in place)
        #[arg(short, long)]
        file: Option<String>,

        /// Print the structured result ({enhancedPrompt, intent}) only
        #[arg(long)]
        json: bool,

        /// Workspace root for staged prompt files (default: current directory)
        #[arg(long)]
        cwd: Option<String>,
    },

    /// Interactive realtime chat: every message gets an optimized preview
    Chat {
        /// Initial message to send
        message: Option<String>,

        /// Workspace root for staged prompt files
        #[arg(short, long)]
        cwd: Option<String>,
    },

    /// Switch between manual, realtime and file modes
    SwitchMode {
        /// Mode to switch to; asks when omitted
        mode: Option<String>,
    },

    /// Choose the model used for optimization
    SwitchModel {
        /// Model id or preset; asks when omitted
        model: Option<String>,
    },

    /// Toggle realtime auto-optimization
    ToggleAutoOptimize,

    /// Send a .prompt.md file to the chat
    ProcessFile {
        file: String,
    },

    /// Copy a prompt to the clipboard and hand it to the chat
    RunPrompt {
        prompt: String,
    },

    /// Stage an already-optimized prompt as a .prompt.md file
    CreatePromptFile {
        /// The prompt as originally written
        original: String,

        /// The optimized prompt
        optimized: String,

        /// Workspace root (default: current directory)
        #[arg(long)]
        cwd: Option<String>,
    },

    /// Show settings, saved state and available models
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start LSP server (stdio - for editor integration)
    Lsp,

    /// Start HTTP server for the chat integration
    Serve {
        /// Port to listen on (default: server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default: server.host from the config)
        #[arg(long)]
        host: Option<String>,

        /// Workspace root for staged prompt files (default: current directory)
        #[arg(long)]
        cwd: Option<String>,
    },
}

fn booster_parts() -> Result<BoosterParts> {
    let config = Arc::new(ConfigStore::open()?);
    let state = Arc::new(StateStore::open()?);
    let catalog: Arc<dyn ModelCatalog> = Arc::new(ConfiguredCatalog::new(config.snapshot().llm));
    Ok(BoosterParts {
        config,
        state,
        catalog,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "prompt_booster=debug,tower_lsp=debug"
    } else {
        "prompt_booster=info,tower_lsp=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Boost { file, lines } => {
            transport::cli::run_boost(&file, lines.as_deref()).await?;
        }
        Commands::Optimize {
            prompt,
            file,
            json,
            cwd,
        } => {
            transport::cli::run_optimize(prompt, file.as_deref(), json, cwd.as_deref()).await?;
        }
        Commands::Chat { message, cwd } => {
            transport::cli::run_chat(message, cwd.as_deref()).await?;
        }
        Commands::SwitchMode { mode } => {
            transport::cli::run_switch_mode(mode.as_deref()).await?;
        }
        Commands::SwitchModel { model } => {
            transport::cli::run_switch_model(model).await?;
        }
        Commands::ToggleAutoOptimize => {
            transport::cli::run_toggle_auto_optimize().await?;
        }
        Commands::ProcessFile { file } => {
            transport::cli::run_process_file(&file).await?;
        }
        Commands::RunPrompt { prompt } => {
            transport::cli::run_run_prompt(&prompt).await?;
        }
        Commands::CreatePromptFile {
            original,
            optimized,
            cwd,
        } => {
            transport::cli::run_create_prompt_file(&original, &optimized, cwd.as_deref()).await?;
        }
        Commands::Status { json } => {
            transport::cli::run_status(json).await?;
        }
        Commands::Lsp => {
            tracing::info!("Starting LSP server on stdio");
            lsp::run_lsp_server(booster_parts()?).await?;
        }
        Commands::Serve { port, host, cwd } => {
            let parts = booster_parts()?;
            let server = parts.config.snapshot().server;
            let host = host.unwrap_or(server.host);
            let port = port.unwrap_or(server.port);
            let working_dir = cwd
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| ".".into()));
            tracing::info!(
                "Starting HTTP server on {}:{}, cwd: {:?}",
                host,
                port,
                working_dir
            );
            transport::http::run_http_server(&host, port, parts, working_dir).await?;
        }
    }

    Ok(())
}
