//! Listener runtime: bind, serve and gracefully shut down one listener.
//!
//! Plain HTTP or TLS is selected from the presence of certificate material.
//! A requested shutdown makes [`serve`] return `Ok`; every other outcome is
//! a fault the caller must treat as fatal.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

/// Faults from the live listener. These are unrecoverable: the server cannot
/// keep a believed-but-false "serving" state.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to load TLS material: {0}")]
    TlsConfig(io::Error),

    #[error("listener fault: {0}")]
    Listen(io::Error),
}

/// Serve `app` on `addr` until the handle requests shutdown.
///
/// TLS material is loaded here, never generated; provisioning happened at
/// configure time.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    tls: Option<(PathBuf, PathBuf)>,
    handle: Handle,
) -> Result<(), ServerError> {
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    match tls {
        Some((cert, key)) => {
            tracing::info!(
                %addr,
                cert = %cert.display(),
                key = %key.display(),
                "https server starting"
            );
            let rustls_config = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .map_err(ServerError::TlsConfig)?;
            axum_server::bind_rustls(addr, rustls_config)
                .handle(handle)
                .serve(service)
                .await
                .map_err(ServerError::Listen)?;
        }
        None => {
            tracing::info!(%addr, "http server starting");
            axum_server::bind(addr)
                .handle(handle)
                .serve(service)
                .await
                .map_err(ServerError::Listen)?;
        }
    }

    tracing::info!(%addr, "listener closed");
    Ok(())
}
