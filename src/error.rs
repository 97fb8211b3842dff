//! Error taxonomy surfaced to the operator console.

use crate::config::ConfigError;
use crate::tls::TlsError;

/// Errors returned by the lifecycle control surface.
///
/// Listener faults are not represented here: they occur after `start` has
/// returned and are delivered on the module's fault channel instead.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Start or configure was invoked while the server was running.
    #[error("already started")]
    AlreadyRunning,

    /// A parameter failed to resolve, validate or expand.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// TLS material could not be generated.
    #[error(transparent)]
    Tls(#[from] TlsError),
}
