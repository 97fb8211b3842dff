//! The request dispatcher: a catch-all static file service with an
//! access-log side effect.
//!
//! The log sink is a capability passed in at construction so the dispatcher
//! can be exercised without a global subscriber. One entry is recorded per
//! request, before the file service runs; response semantics are entirely
//! those of the underlying [`ServeDir`].

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use http::{header, Method};
use tower_http::services::ServeDir;

/// One access-log line: client, method, host and path.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub client: IpAddr,
    pub method: Method,
    pub host: String,
    pub path: String,
}

impl fmt::Display for AccessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}{}", self.client, self.method, self.host, self.path)
    }
}

/// Where access entries go. Implementations must be safe to call from
/// concurrent request handlers.
pub trait AccessSink: Send + Sync {
    fn record(&self, entry: &AccessEntry);
}

/// Default sink emitting one structured tracing event per request.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AccessSink for TracingSink {
    fn record(&self, entry: &AccessEntry) {
        tracing::info!(
            client = %entry.client,
            method = %entry.method,
            host = %entry.host,
            path = %entry.path,
            "request"
        );
    }
}

/// Build the catch-all router serving `root`, logging to `sink`.
pub fn router(root: &Path, sink: Arc<dyn AccessSink>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn_with_state(sink, access_log))
}

/// Record one access entry, then delegate to the file service.
async fn access_log(
    State(sink): State<Arc<dyn AccessSink>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let entry = AccessEntry {
        client: peer.ip(),
        method: request.method().clone(),
        host,
        path: request.uri().path().to_string(),
    };
    sink.record(&entry);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn access_entry_formats_client_method_host_path() {
        let entry = AccessEntry {
            client: "192.0.2.7".parse().unwrap(),
            method: Method::GET,
            host: "files.local".to_string(),
            path: "/index.html".to_string(),
        };
        assert_eq!(entry.to_string(), "192.0.2.7 GET files.local/index.html");
    }

    #[test]
    fn sinks_receive_entries_by_reference() {
        struct Collecting(Mutex<Vec<String>>);
        impl AccessSink for Collecting {
            fn record(&self, entry: &AccessEntry) {
                self.0.lock().unwrap().push(entry.to_string());
            }
        }

        let sink = Collecting(Mutex::new(Vec::new()));
        sink.record(&AccessEntry {
            client: "127.0.0.1".parse().unwrap(),
            method: Method::HEAD,
            host: "localhost".into(),
            path: "/".into(),
        });
        assert_eq!(sink.0.lock().unwrap().as_slice(), ["127.0.0.1 HEAD localhost/"]);
    }

    #[test]
    fn router_builds_for_any_root() {
        let _router = router(Path::new("/nonexistent"), Arc::new(TracingSink));
    }
}
