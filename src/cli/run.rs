//! Serve the AgoraPass REST API
//!
//! Loads configuration (generating a default on first run), initializes
//! tracing, opens the database, constructs the external-service clients,
//! and binds the listener. Clients are built once here and injected into
//! the router state; the pool is closed explicitly when the server exits.

use super::config::{default_config_path, AgoraConfig, POD_SIGNING_KEY_ENV};
use agorapass::attestation::index::EasScanIndex;
use agorapass::attestation::relay::StampRelay;
use agorapass::attestation::AttestationParams;
use agorapass::identity::PrivyIdentity;
use agorapass::season::RpcSeasonContract;
use agorapass::server::{router, AppState};
use agorapass::store::Store;
use agorapass::zupass::{PodSigner, StampPodIssuer};
use alloy::primitives::{Address, B256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run the API server
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = if config_path.exists() {
        AgoraConfig::load(&config_path)?
    } else {
        println!("📝 No config file found. Creating default configuration...");
        AgoraConfig::create_default(&config_path)?;
        println!("   Created: {}", config_path.display());
        println!("   Edit the endpoints, then start again.");
        AgoraConfig::load(&config_path)?
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(config = %config_path.display(), "starting agorapass service");

    let store = Store::open(&config.database.path).await?;
    let http = reqwest::Client::new();

    let params = AttestationParams {
        chain_id: config.chain.chain_id,
        eas_contract: parse_address(&config.chain.eas_contract, "chain.eas_contract")?,
        schema: parse_b256(&config.chain.schema_uid, "chain.schema_uid")?,
        zupass_schema: parse_b256(&config.chain.zupass_schema_uid, "chain.zupass_schema_uid")?,
    };
    let season_contract = parse_address(&config.chain.season_contract, "chain.season_contract")?;

    // Signing key is optional: without it, sign-pod fails closed per request
    let pod_signer = match std::env::var(POD_SIGNING_KEY_ENV) {
        Ok(key) => Some(Arc::new(PodSigner::from_hex_key(&key)?)),
        Err(_) => {
            warn!("{POD_SIGNING_KEY_ENV} not set; sign-pod will be unavailable");
            None
        }
    };

    let state = AppState {
        store: store.clone(),
        identity: Arc::new(PrivyIdentity::new(
            http.clone(),
            config.identity.base_url.clone(),
            config.relay.app_id.clone(),
        )),
        relay: Arc::new(StampRelay::new(
            http.clone(),
            config.relay.base_url.clone(),
            config.relay.app_id.clone(),
        )),
        index: Arc::new(EasScanIndex::new(http.clone(), config.chain.index_url.clone())),
        season: Arc::new(RpcSeasonContract::new(
            http.clone(),
            config.chain.rpc_url.clone(),
            season_contract,
        )),
        pod_issuer: Arc::new(StampPodIssuer::new(
            http,
            config.relay.base_url.clone(),
            config.relay.app_id.clone(),
        )),
        pod_signer,
        params,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "listening");

    axum::serve(listener, router(state)).await?;

    store.close().await;
    Ok(())
}

fn parse_address(value: &str, field: &str) -> Result<Address, Box<dyn std::error::Error>> {
    value
        .parse()
        .map_err(|_| format!("invalid address in {field}: '{value}'").into())
}

fn parse_b256(value: &str, field: &str) -> Result<B256, Box<dyn std::error::Error>> {
    value
        .parse()
        .map_err(|_| format!("invalid 32-byte hex in {field}: '{value}'").into())
}
