pub mod api;
pub mod client;
pub mod error;
pub mod form;
pub mod models;
pub mod render;
pub mod repo;
pub mod settings;
pub mod shell;
pub mod validation;
pub mod views;

#[cfg(test)]
mod test_support;

use axum::{serve::Serve, Router};
use tokio::net::TcpListener;
use tracing::info;

use api::build_app;
use client::HttpBookStore;
use error::StartupError;
use settings::Settings;

pub async fn start_server(
    settings: Settings,
) -> Result<Serve<TcpListener, Router, Router>, StartupError> {
    let store = HttpBookStore::new(&settings.store_url)?;
    info!("Using book store at {}", store.base_url());

    let router = build_app(store);

    let bind_error = |source: std::io::Error| StartupError::Bind {
        addr: settings.bind_addr,
        source,
    };
    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;
    info!("Listening on {}", local_addr);

    Ok(axum::serve(listener, router))
}
