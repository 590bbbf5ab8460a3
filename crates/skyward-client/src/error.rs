//! Errors surfaced by the client runtime.

use skyward_config::ConfigError;
use skyward_net::NetError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `client.server_address` did not resolve.
    #[error("cannot resolve server address {0}")]
    InvalidServerAddress(String),

    /// Local socket setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Discovery, login or send failure.
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
