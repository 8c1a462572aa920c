use clap::{Parser, Subcommand};
use lib::flow::{FlowBackend, FlowRequest, LangflowClient};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Teams to Langflow relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the messaging endpoint (POST /api/messages). Environment variables and `.env`
    /// override the config file.
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 3979)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message to the configured flow and print the extracted reply.
    Ask {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Print the raw flow response instead of the extracted text.
        #[arg(long)]
        raw: bool,

        /// Message text
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, raw, message }) => {
            if let Err(e) = run_ask(config, raw, message).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn load(config_path: Option<std::path::PathBuf>) -> anyhow::Result<lib::config::Config> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    log::debug!("config: {}", path.display());
    lib::config::apply_process_env(&mut config);
    Ok(config)
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!("starting gateway on {}:{}", config.server.bind, config.server.port);
    lib::gateway::run_gateway(config).await
}

async fn run_ask(
    config_path: Option<std::path::PathBuf>,
    raw: bool,
    message: String,
) -> anyhow::Result<()> {
    let config = load(config_path)?;
    if config.flow.target().is_empty() {
        anyhow::bail!("no flow configured (set flow.flowId, flow.endpoint, LANGFLOW_FLOW_ID or LANGFLOW_ENDPOINT)");
    }
    let client = LangflowClient::new(&config.flow, &config.http)?;
    let request = FlowRequest::from_config(message, &config.flow);
    match client.run(&request).await {
        Ok(response) if raw => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Ok(response) => {
            println!("{}", lib::extract::extract_text(&response));
        }
        Err(e) => {
            let err = lib::error::TurnError::from(e);
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    }
    Ok(())
}
