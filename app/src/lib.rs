//! SwiftSwap application library

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use evm_client::{ChainClient, RpcClient};
use swiftswap_api::{start_server, AppState};
use swiftswap_core::{AppConfig, Deployment};

/// Config file used when `$SWIFTSWAP_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "swiftswap.json";

const CONFIG_ENV: &str = "SWIFTSWAP_CONFIG";
const DEPLOYMENT_ENV: &str = "SWIFTSWAP_DEPLOYMENT";

/// Load the config file (defaults when it is absent), then overlay a
/// deployment file if one is given.
pub fn load_config(config_path: &Path, deployment_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config = if config_path.exists() {
        AppConfig::load(config_path)
            .with_context(|| format!("loading config {}", config_path.display()))?
    } else {
        tracing::info!(
            "No config at {}, using defaults",
            config_path.display()
        );
        AppConfig::default()
    };

    if let Some(path) = deployment_path {
        let deployment = Deployment::load(path)
            .with_context(|| format!("loading deployment {}", path.display()))?;
        tracing::info!(
            "Applying deployment for {} (chain {})",
            deployment.network,
            deployment.chain_id
        );
        config.apply_deployment(&deployment);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("swiftswap=debug,info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run the API server until it exits
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("Starting SwiftSwap");

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let deployment_path = std::env::var_os(DEPLOYMENT_ENV).map(PathBuf::from);
    let config = load_config(&config_path, deployment_path.as_deref())?;

    tracing::info!(
        "Loaded {} tokens and {} pools for {}",
        config.tokens.len(),
        config.pools.len(),
        config.network
    );

    let client = RpcClient::new(config.rpc.clone(), config.network)?;
    let status = client.status().await;
    if !status.is_online {
        tracing::warn!("RPC endpoint {} is not responding", config.rpc.url);
    } else if !status.is_expected_network() {
        tracing::warn!(
            "RPC endpoint reports chain {:?}, expected {}",
            status.chain_id,
            status.expected_chain_id
        );
    } else {
        tracing::info!("Connected to chain {:?} at block {}", status.chain_id, status.block_number);
    }

    let port = config.api_port;
    let state = AppState::new(config, Arc::new(client))?;
    start_server(state, port).await?;
    Ok(())
}
