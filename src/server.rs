//! HTTP responder for packaged artifacts.
//!
//! Exposes `cert.cbor` and the signed exchange with the media types SXG
//! verifiers require. Files are read from the output directory on every
//! request, so re-running `pack` takes effect without a restart.

use std::net::ToSocketAddrs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::cli::ServeArgs;
use crate::workspace;

const CERT_CHAIN_MIME: &str = "application/cert-chain+cbor";
const EXCHANGE_MIME: &str = "application/signed-exchange;v=b3";

pub fn serve(args: ServeArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    rt.block_on(run(args))
}

async fn run(args: ServeArgs) -> Result<()> {
    let cert_chain = args.dir.join(workspace::CERT_CHAIN);
    let exchange = args.dir.join(&args.sxg);

    let app = Router::new()
        .route("/", get(|| async { "Signed Exchange Demo" }))
        .route(
            "/cert.cbor",
            get(move || artifact(cert_chain.clone(), CERT_CHAIN_MIME)),
        )
        .route(
            "/sxg",
            get(move || artifact(exchange.clone(), EXCHANGE_MIME)),
        );

    let addr = (args.host.as_str(), args.port)
        .to_socket_addrs()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?
        .next()
        .context("listen address resolved to nothing")?;

    match (args.tls_crt, args.tls_key) {
        (Some(tls_crt), Some(tls_key)) => {
            let config = RustlsConfig::from_pem_file(tls_crt, tls_key)
                .await
                .context("failed to load TLS certificate and key")?;
            info!(%addr, "serving signed exchange over HTTPS");
            axum_server::bind_rustls(addr, config)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            info!(%addr, "serving signed exchange over HTTP");
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}

async fn artifact(path: PathBuf, content_type: &'static str) -> Response {
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            format!("{}: {e}", path.display()),
        )
            .into_response(),
    }
}
