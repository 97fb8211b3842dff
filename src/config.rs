//! Parameter names, defaults and per-run configuration resolution.
//!
//! `ServerConfig` is the immutable snapshot one serving cycle runs with,
//! resolved from the parameter store on every configure. Certificate and key
//! paths go through home-directory expansion so operators can use `~`
//! shorthand; an empty path means the side is unset.

use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::params::{validators, ParamError, ParamSpec, ParamStore};

// =============================================================================
// Parameters
// =============================================================================

/// Directory tree to serve.
pub const PARAM_PATH: &str = "http.path";
/// Listen address.
pub const PARAM_ADDRESS: &str = "http.address";
/// Listen port.
pub const PARAM_PORT: &str = "http.port";
/// TLS certificate file.
pub const PARAM_CERTIFICATE: &str = "http.certificate";
/// TLS private key file.
pub const PARAM_KEY: &str = "http.key";
/// Subject common name used when generating TLS material.
pub const PARAM_CERT_COMMON_NAME: &str = "http.cert.common_name";
/// Subject organization used when generating TLS material.
pub const PARAM_CERT_ORGANIZATION: &str = "http.cert.organization";
/// Subject country used when generating TLS material.
pub const PARAM_CERT_COUNTRY: &str = "http.cert.country";
/// Validity window in days for generated TLS material.
pub const PARAM_CERT_VALIDITY_DAYS: &str = "http.cert.validity_days";
/// Comma-separated subject alternative names for generated TLS material.
pub const PARAM_CERT_ALT_NAMES: &str = "http.cert.alt_names";

/// Ceiling on draining in-flight requests during a stop; connections still
/// open at the deadline are closed forcibly.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// Default log filter when RUST_LOG is not set.
pub const DEFAULT_LOG_FILTER: &str = "staticd=debug,tower_http=debug";

/// Register every server parameter with its default.
pub fn register_params(store: &ParamStore) {
    store.define(ParamSpec::new(PARAM_PATH, ".", "Directory tree to serve."));
    store.define(
        ParamSpec::new(PARAM_ADDRESS, "127.0.0.1", "Address to bind the server to.")
            .with_validator(validators::ipv4),
    );
    store.define(
        ParamSpec::new(PARAM_PORT, "80", "Port to bind the server to.")
            .with_validator(validators::port),
    );
    store.define(ParamSpec::new(
        PARAM_CERTIFICATE,
        "",
        "TLS certificate file; together with a key this enables HTTPS, generated when missing.",
    ));
    store.define(ParamSpec::new(
        PARAM_KEY,
        "",
        "TLS private key file; together with a certificate this enables HTTPS, generated when missing.",
    ));
    store.define(ParamSpec::new(
        PARAM_CERT_COMMON_NAME,
        "localhost",
        "Subject common name for generated certificates.",
    ));
    store.define(ParamSpec::new(
        PARAM_CERT_ORGANIZATION,
        "",
        "Subject organization for generated certificates.",
    ));
    store.define(ParamSpec::new(
        PARAM_CERT_COUNTRY,
        "US",
        "Subject country for generated certificates.",
    ));
    store.define(ParamSpec::new(
        PARAM_CERT_VALIDITY_DAYS,
        "365",
        "Validity in days for generated certificates.",
    ));
    store.define(ParamSpec::new(
        PARAM_CERT_ALT_NAMES,
        "localhost",
        "Comma-separated subject alternative names for generated certificates.",
    ));
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Immutable configuration snapshot for one serving cycle.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub addr: SocketAddr,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl ServerConfig {
    /// Resolve a snapshot from the parameter store. Any missing, invalid or
    /// unexpandable value aborts resolution with no partial state.
    pub fn resolve(params: &ParamStore) -> Result<Self, ConfigError> {
        let root = PathBuf::from(params.string(PARAM_PATH)?);
        let address = params.string(PARAM_ADDRESS)?;
        let port: u16 = params.parse(PARAM_PORT)?;
        let raw_addr = format!("{address}:{port}");
        let addr: SocketAddr = raw_addr.parse().map_err(|source| ConfigError::BadAddress {
            addr: raw_addr,
            source,
        })?;
        let certificate = expand_optional(params.string(PARAM_CERTIFICATE)?)?;
        let key = expand_optional(params.string(PARAM_KEY)?)?;
        Ok(Self {
            root,
            addr,
            certificate,
            key,
        })
    }

    /// HTTPS is in effect only when both certificate and key are set.
    pub fn is_tls(&self) -> bool {
        self.certificate.is_some() && self.key.is_some()
    }

    /// Certificate and key paths when both are set.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        self.certificate.clone().zip(self.key.clone())
    }
}

fn expand_optional(raw: String) -> Result<Option<PathBuf>, ConfigError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        expand_home(&raw).map(Some)
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(raw: &str) -> Result<PathBuf, ConfigError> {
    let home = || dirs::home_dir().ok_or_else(|| ConfigError::HomeExpansion(raw.to_string()));
    if raw == "~" {
        return home();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return Ok(home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Apply a TOML table of parameter values to the store.
///
/// The file is a flat table; parameter names contain dots and must be quoted:
///
/// ```toml
/// "http.address" = "0.0.0.0"
/// "http.port" = 8080
/// ```
pub fn load_params_file(store: &ParamStore, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = contents.parse()?;
    for (name, value) in table {
        let value = match value {
            toml::Value::String(s) => s,
            other => other.to_string(),
        };
        store.set(&name, value)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("invalid listen address {addr}: {source}")]
    BadAddress {
        addr: String,
        source: AddrParseError,
    },

    #[error("cannot expand '{0}': home directory unknown")]
    HomeExpansion(String),

    #[error("failed to read parameter file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse parameter file: {0}")]
    Parse(#[from] toml::de::Error),
}
