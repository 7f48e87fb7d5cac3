//! Agent Gate - command-line host for manifest-driven agents
//!
//! Manages the configured agent list, evaluates requests against agent rules
//! and talks to agents the way the browser extension does.

use agent_gate::{
    config::AgentGateConfig, Agent, AgentOptions, AgentRepository, FileStore, HttpRequestEvent,
};
use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agent-gate")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Host for manifest-driven agents on intercepted HTTP traffic")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AGENT_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an agent manifest and register the agent
    Add {
        /// Agent base URL or manifest.json URL
        url: String,
    },

    /// List configured agents
    List,

    /// Remove a configured agent
    Remove {
        /// Agent id
        id: String,
    },

    /// Evaluate a request against every configured agent
    Match {
        /// Request URL
        #[arg(long)]
        url: String,

        /// Request method
        #[arg(long, default_value = "GET")]
        method: String,

        /// Resource type (main_frame, xmlhttprequest, ...)
        #[arg(long = "type", default_value = "main_frame")]
        resource_type: String,
    },

    /// Open a session with an agent and stream the answer to a question
    Ask {
        /// Agent id
        agent_id: String,

        /// Question text
        question: String,
    },

    /// Transcribe an audio file within an existing session
    Transcribe {
        /// Agent id
        agent_id: String,

        /// Session id
        session_id: String,

        /// Audio file to upload
        audio_file: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("agent_gate={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AgentGateConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => AgentGateConfig::default(),
    };

    match cli.command {
        Commands::Add { url } => add_agent(&config, &url).await?,
        Commands::List => list_agents(&config).await?,
        Commands::Remove { id } => remove_agent(&config, &id).await?,
        Commands::Match {
            url,
            method,
            resource_type,
        } => {
            match_request(&config, HttpRequestEvent::new(url, method, resource_type)).await?;
        }
        Commands::Ask { agent_id, question } => ask(&config, &agent_id, &question).await?,
        Commands::Transcribe {
            agent_id,
            session_id,
            audio_file,
        } => transcribe(&config, &agent_id, &session_id, &audio_file).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn open_repository(
    config: &AgentGateConfig,
) -> Result<(AgentRepository<FileStore>, AgentOptions)> {
    let options = config.agent_options()?;
    let store = FileStore::open(&config.storage.path).await?;
    tracing::debug!("Agent list stored at {}", store.path().display());
    Ok((AgentRepository::new(store, options.clone()), options))
}

async fn find_agent(config: &AgentGateConfig, agent_id: &str) -> Result<Agent> {
    let (repo, _) = open_repository(config).await?;
    match repo.find_by_id(agent_id).await? {
        Some(agent) => Ok(agent),
        None => bail!("No agent with id '{}' is configured", agent_id),
    }
}

async fn add_agent(config: &AgentGateConfig, url: &str) -> Result<()> {
    let (repo, options) = open_repository(config).await?;
    let agent = Agent::from_url(url, options).await?;
    repo.add_agent(&agent).await?;
    println!("Added {} ({}) from {}", agent.manifest().name, agent.id(), agent.url());
    Ok(())
}

async fn list_agents(config: &AgentGateConfig) -> Result<()> {
    let (repo, _) = open_repository(config).await?;
    let agents = repo.find_all().await?;
    if agents.is_empty() {
        println!("No agents configured");
    }
    for agent in agents {
        let activation = agent
            .activation_rule()
            .map(|rule| rule.condition.url_regex.as_str())
            .unwrap_or("-");
        println!(
            "{}\t{}\t{}\tactivates on {}",
            agent.id(),
            agent.manifest().name,
            agent.url(),
            activation
        );
    }
    Ok(())
}

async fn remove_agent(config: &AgentGateConfig, agent_id: &str) -> Result<()> {
    let (repo, _) = open_repository(config).await?;
    if repo.remove_agent(agent_id).await? {
        println!("Removed {}", agent_id);
    } else {
        println!("No agent with id '{}' is configured", agent_id);
    }
    Ok(())
}

async fn match_request(config: &AgentGateConfig, request: HttpRequestEvent) -> Result<()> {
    let (repo, _) = open_repository(config).await?;
    for agent in repo.find_all().await? {
        let actions = agent.find_matching_actions(&request);
        let activates = agent.activates_on(&request);
        if actions.is_empty() && !activates {
            continue;
        }

        println!("{} (activates: {})", agent.id(), activates);
        for action in actions {
            println!("  {}", serde_json::to_string(action)?);
        }
    }
    Ok(())
}

async fn ask(config: &AgentGateConfig, agent_id: &str, question: &str) -> Result<()> {
    let agent = find_agent(config, agent_id).await?;
    let session = agent.create_session(&config.session.locales).await?;
    tracing::info!("Opened session {} with {}", session.id, agent.id());

    let mut answer = agent.ask(question, &session.id);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = answer.next_fragment().await {
        write!(stdout, "{}", fragment?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    if let Some(close) = agent.session_close_request(&session.id) {
        tracing::info!(
            "Session {} ends with {} {}",
            close.session_id,
            close.method,
            close.url
        );
    }
    Ok(())
}

async fn transcribe(
    config: &AgentGateConfig,
    agent_id: &str,
    session_id: &str,
    audio_file: &Path,
) -> Result<()> {
    let agent = find_agent(config, agent_id).await?;
    let audio = tokio::fs::read(audio_file)
        .await
        .with_context(|| format!("Failed to read {}", audio_file.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(audio);

    let text = agent.transcript_audio(&encoded, session_id).await?;
    println!("{}", text);
    Ok(())
}

fn show_config(config: Option<&AgentGateConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
