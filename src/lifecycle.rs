//! Server lifecycle management.
//!
//! [`HttpServer`] is the controllable unit an outer console drives through
//! the [`ServerControl`] contract: `configure` resolves parameters and
//! provisions TLS material, `start` transitions the unit to running and
//! serves in the background, `stop` drains connections and returns it to
//! idle. The running flag and the per-run state change together under one
//! lock, so concurrent start and stop calls cannot both believe they own a
//! transition.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_server::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::{self, ServerConfig, SHUTDOWN_GRACE};
use crate::error::ModuleError;
use crate::http::dispatch::{self, AccessSink, TracingSink};
use crate::http::server::{self, ServerError};
use crate::params::ParamStore;
use crate::tls::{self, CertProfile};

/// Control contract for a server unit hosted by an outer console.
#[async_trait]
pub trait ServerControl: Send + Sync {
    /// Resolve configuration and provision TLS material. Opens no socket.
    fn configure(&self) -> Result<(), ModuleError>;

    /// Configure, then begin serving in the background. Must be called from
    /// within a tokio runtime.
    fn start(&self) -> Result<(), ModuleError>;

    /// Drain in-flight requests and release the listener. Stopping an idle
    /// server is a no-op.
    async fn stop(&self) -> Result<(), ModuleError>;
}

/// Per-run state, replaced on every start and discarded on stop.
#[derive(Default)]
struct Inner {
    config: Option<ServerConfig>,
    router: Option<Router>,
    handle: Option<Handle>,
    task: Option<JoinHandle<()>>,
}

/// A static-content HTTP/HTTPS server driven through [`ServerControl`].
pub struct HttpServer {
    params: Arc<ParamStore>,
    sink: Arc<dyn AccessSink>,
    running: Arc<AtomicBool>,
    fault_tx: UnboundedSender<ServerError>,
    inner: Mutex<Inner>,
}

impl HttpServer {
    /// Create a server reading from `params`, registering its parameters
    /// with their defaults. The returned receiver delivers fatal listener
    /// faults; the supervisor decides between process exit and
    /// log-and-continue.
    pub fn new(params: Arc<ParamStore>) -> (Self, UnboundedReceiver<ServerError>) {
        Self::with_access_sink(params, Arc::new(TracingSink))
    }

    /// Same as [`HttpServer::new`] with a custom access-log sink.
    pub fn with_access_sink(
        params: Arc<ParamStore>,
        sink: Arc<dyn AccessSink>,
    ) -> (Self, UnboundedReceiver<ServerError>) {
        config::register_params(&params);
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let server = Self {
            params,
            sink,
            running: Arc::new(AtomicBool::new(false)),
            fault_tx,
            inner: Mutex::new(Inner::default()),
        };
        (server, fault_rx)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Local address of the live listener, once bound. `None` while idle or
    /// when the listener terminated before binding.
    pub async fn bound_addr(&self) -> Option<SocketAddr> {
        let handle = self
            .inner
            .lock()
            .expect("lifecycle lock poisoned")
            .handle
            .clone()?;
        handle.listening().await
    }
}

#[async_trait]
impl ServerControl for HttpServer {
    fn configure(&self) -> Result<(), ModuleError> {
        if self.is_running() {
            return Err(ModuleError::AlreadyRunning);
        }
        let config = ServerConfig::resolve(&self.params)?;
        if let Some((cert, key)) = config.tls_paths() {
            let profile = CertProfile::resolve(&self.params)?;
            tls::provision(&cert, &key, &profile)?;
        }
        let router = dispatch::router(&config.root, Arc::clone(&self.sink));

        let mut inner = self.inner.lock().expect("lifecycle lock poisoned");
        inner.config = Some(config);
        inner.router = Some(router);
        Ok(())
    }

    fn start(&self) -> Result<(), ModuleError> {
        self.configure()?;

        let mut inner = self.inner.lock().expect("lifecycle lock poisoned");
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ModuleError::AlreadyRunning);
        }

        let config = inner.config.clone().expect("configure stores a snapshot");
        let router = inner.router.take().expect("configure builds the dispatcher");
        let handle = Handle::new();
        let running = Arc::clone(&self.running);
        let fault_tx = self.fault_tx.clone();
        let serve_handle = handle.clone();

        // The running flag flips before the serve future is entered, so a
        // concurrent stop always finds a handle to shut down.
        inner.task = Some(tokio::spawn(async move {
            match server::serve(router, config.addr, config.tls_paths(), serve_handle).await {
                Ok(()) => {}
                Err(err) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = fault_tx.send(err);
                }
            }
        }));
        inner.handle = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ModuleError> {
        let (handle, task) = {
            let mut inner = self.inner.lock().expect("lifecycle lock poisoned");
            if self
                .running
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                tracing::debug!("stop requested while idle");
                return Ok(());
            }
            inner.config = None;
            inner.router = None;
            (inner.handle.take(), inner.task.take())
        };

        if let Some(handle) = handle {
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "serve task terminated abnormally");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_server() -> (HttpServer, UnboundedReceiver<ServerError>) {
        HttpServer::new(Arc::new(ParamStore::new()))
    }

    #[test]
    fn configure_resolves_defaults_without_starting() {
        let (server, _faults) = new_server();
        server.configure().unwrap();
        assert!(!server.is_running());
    }

    #[test]
    fn configure_can_be_repeated_while_idle() {
        let (server, _faults) = new_server();
        server.configure().unwrap();
        server.configure().unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_noop() {
        let (server, _faults) = new_server();
        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn bound_addr_is_none_while_idle() {
        let (server, _faults) = new_server();
        assert_eq!(server.bound_addr().await, None);
    }
}
