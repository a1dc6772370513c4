//! Main module for the Markdown Stylist binary (`stylist`).
//!
//! Parses the command line, resolves configuration and dispatches to the
//! selected subcommand. With no subcommand the HTTP service is started.
//!
//! # Examples
//!
//! ```sh
//! OPENAI_API_KEY=sk-... stylist serve --port 5000
//! stylist init
//! stylist validate docs/README.md
//! stylist check
//! ```

use std::{error::Error, fs, process::ExitCode, sync::Arc};

use clap::Parser;
use markdown_stylist::{
    api::{CompletionResult, LlmAdapter},
    commands::{Cli, Commands},
    config::{self, CONFIG_FILE_NAME, ServiceConfig},
    config_dir, server,
    server::AppState,
    store::StyleGuideStore,
    template::PromptTemplates,
    validate::validate,
};
use once_cell::sync::OnceCell;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

static TRACING: OnceCell<()> = OnceCell::new();

const SAMPLE_GUIDE_NAME: &str = "sample";

const SAMPLE_GUIDE: &str = "# Sample Style Guide

## Headings
- Use sentence case for every heading.
- Put a space between the `#` characters and the heading text.
- Never skip a heading level.

## Prose
- Prefer the active voice.
- Keep sentences under 25 words where possible.
- Use the Oxford comma.
- Spell out numbers one through nine.

## Lists
- Start each item with a capital letter.
- Only end items with a period when they are full sentences.

## Code
- Wrap commands, file names and identifiers in backticks.
- Give every fenced code block a language.
";

fn main() -> ExitCode {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Resolve configuration and execute the requested command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the listener
/// cannot be bound, or the selected command fails.
async fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let mut service_config = config::resolve_config(cli.config.as_deref())?;
    service_config.apply(cli.overrides);
    debug!("Config resolved: {:?}", redacted(&service_config));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(&service_config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init => {
            init(&service_config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { path } => {
            let content = fs::read_to_string(&path)?;
            let report = validate(&content);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Check => check(&service_config).await,
    }
}

async fn serve(service_config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let state = AppState::from_config(service_config).await?;

    let guides = state.store.list().await?;
    info!(
        "Serving {} style guide(s) from {}",
        guides.len(),
        state.store.dir().display()
    );

    let listener = TcpListener::bind(service_config.bind_address()).await?;
    server::serve(listener, Arc::new(state)).await?;
    Ok(())
}

/// Write a default config file and a sample style guide, keeping any that
/// already exist.
async fn init(service_config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        info!("Keeping existing config file: {}", config_path.display());
    } else {
        info!("Creating config file: {}", config_path.display());
        let config_yaml = serde_yaml::to_string(&ServiceConfig::default())?;
        fs::write(&config_path, config_yaml)?;
    }

    let store = StyleGuideStore::new(service_config.style_guides_dir.clone());
    let existing = store.list().await?;
    if existing.iter().any(|name| name == SAMPLE_GUIDE_NAME) {
        info!("Keeping existing style guide '{}'", SAMPLE_GUIDE_NAME);
    } else {
        store.save(SAMPLE_GUIDE_NAME, SAMPLE_GUIDE).await?;
    }

    Ok(())
}

/// Verify the provider answers, printing its reply.
async fn check(service_config: &ServiceConfig) -> Result<ExitCode, Box<dyn Error>> {
    let Some(settings) = service_config.llm_settings() else {
        error!("OpenAI API key not found. Please set OPENAI_API_KEY in your environment.");
        return Ok(ExitCode::FAILURE);
    };

    let adapter = LlmAdapter::new(&settings, PromptTemplates::default())?;
    match adapter.ping().await? {
        CompletionResult::Success { text, tokens_used } => {
            println!("API connection successful ({tokens_used} tokens)");
            println!("Response: {text}");
            Ok(ExitCode::SUCCESS)
        }
        CompletionResult::Failure { message } => {
            println!("API connection failed: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn redacted(service_config: &ServiceConfig) -> ServiceConfig {
    ServiceConfig {
        api_key: service_config.api_key.as_ref().map(|_| "<redacted>".to_string()),
        ..service_config.clone()
    }
}
