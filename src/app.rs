use crate::{config::Config, dispatcher::Dispatcher, handler, runtime::RuntimeClient};
use anyhow::{anyhow, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub token: CancellationToken,
}

pub type AppState = Arc<AppStateInner>;

#[derive(Default)]
pub struct AppStateBuilder {
    pub config: Option<Config>,
    pub token: Option<CancellationToken>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Fails with a configuration error when a required bot setting is unset.
    pub fn build(self) -> Result<AppState, crate::error::Error> {
        let config = self.config.unwrap_or_default();
        let settings = config.bot.resolve()?;
        info!(
            bot_id = %settings.bot_id,
            bot_alias_id = %settings.bot_alias_id,
            region = %settings.region,
            language = %settings.language,
            "bot settings loaded"
        );
        Ok(Arc::new(AppStateInner {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(settings),
            token: self.token.unwrap_or_default(),
        }))
    }
}

pub fn create_router(state: AppState) -> Router {
    handler::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the local HTTP surface until the state's token is cancelled.
pub async fn serve(state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&state.config.http_addr)
        .await
        .map_err(|e| anyhow!("failed to bind {}: {}", state.config.http_addr, e))?;
    info!("listening on {}", listener.local_addr()?);
    let token = state.token.clone();
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    Ok(())
}

/// Polls the Lambda runtime API until the state's token is cancelled.
pub async fn run_lambda(state: AppState) -> Result<()> {
    let runtime_api = state
        .config
        .runtime_api
        .clone()
        .ok_or_else(|| anyhow!("AWS_LAMBDA_RUNTIME_API is not set"))?;
    let client = RuntimeClient::new(&runtime_api)?;
    client.run(&state.dispatcher, state.token.clone()).await
}
