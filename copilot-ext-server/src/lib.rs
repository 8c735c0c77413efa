// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP front end for Copilot agents.
//!
//! [`router`] exposes `POST /agent`, which verifies the payload signature,
//! resolves the session and hands the request to an [`Agent`], plus
//! `POST /webhook` and `GET /_ping`.

pub mod agent;
pub mod api;
pub mod completions_agent;
pub mod config;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use copilot_ext_core::{EcdsaPayloadVerifier, PayloadVerifier};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use agent::{Agent, AgentRequest, ChannelSink};
pub use api::{agent_handler, webhook_handler, ApiError, AppState};
pub use completions_agent::CompletionsAgent;
use config::ServerConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `copilot_ext` matches every
/// crate of this workspace by target prefix.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,copilot_ext=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Build the application router.
pub fn router(verifier: Arc<dyn PayloadVerifier>, agent: Arc<dyn Agent>) -> Router {
    let state = AppState { verifier, agent };

    Router::new()
        .route("/_ping", get(api::ping))
        .route("/agent", post(agent_handler))
        .route("/webhook", post(webhook_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Build the payload verifier from a pinned key, or fetch the current key.
pub async fn build_verifier(config: &ServerConfig) -> Result<EcdsaPayloadVerifier> {
    if let Some(pem) = &config.verifier.public_key {
        tracing::info!("Using configured payload public key");
        return EcdsaPayloadVerifier::from_pem(pem).context("invalid configured public key");
    }

    tracing::info!("Fetching payload public key from {}", config.verifier.public_keys_url);
    let client = reqwest::Client::new();
    EcdsaPayloadVerifier::fetch(&client, &config.verifier.public_keys_url)
        .await
        .context("failed to create payload verifier")
}

/// Serve `agent` until the listener fails.
pub async fn run_server(config: ServerConfig, agent: Arc<dyn Agent>) -> Result<()> {
    tracing::info!("Starting Copilot agent server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;
    let addr = config.socket_addr()?;

    let verifier = build_verifier(&config).await?;
    let app = router(Arc::new(verifier), agent);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Agent server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
