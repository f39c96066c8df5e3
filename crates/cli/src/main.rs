use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "smsgate")]
#[command(about = "Inbound SMS webhook adapter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway. Provider tokens and IP allow-lists come from the config file and PROVIDER_<ID>_TOKEN / PROVIDER_<ID>_IPS; the delivery API key from delivery.apiKey or DELIVERY_API_KEY.
    Gateway {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8787)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// List registered providers and which security checks are active for each.
    Providers {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("smsgate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Providers { config }) => {
            if let Err(e) = run_providers(config) {
                log::error!("providers failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

fn run_providers(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let registry = lib::providers::ProviderRegistry::with_defaults();
    let policy =
        lib::config::resolve_security(&config, &registry.ids(), lib::config::process_env);
    for id in registry.ids() {
        let (token, ips) = policy
            .get(&id)
            .map(|s| (s.token().is_some(), s.allowed_ips().len()))
            .unwrap_or((false, 0));
        println!(
            "{:<10} token: {:<3}  allowed IPs: {}",
            id,
            if token { "yes" } else { "no" },
            if ips == 0 { "any".to_string() } else { ips.to_string() }
        );
    }
    Ok(())
}
