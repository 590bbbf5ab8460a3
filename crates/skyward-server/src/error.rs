//! Errors surfaced by the authority runtime.

use skyward_config::ConfigError;
use skyward_net::NetError;
use skyward_store::StoreError;

/// Fatal authority errors. Per-datagram failures are logged and never
/// reach this type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `server.bind_address` is not an IP address.
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    /// Socket setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
