//! Finding the authority and logging in.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use skyward_config::Config;
use skyward_net::{Endpoint, LoginAccepted, ServerLink, discover};

use crate::error::ClientError;

/// Resolves the authority's game address.
///
/// A configured `client.server_address` wins (a bare host gets
/// `server.game_port`); otherwise the LAN is searched for a discovery
/// announcement.
pub async fn resolve_server(config: &Config) -> Result<SocketAddr, ClientError> {
    let Some(address) = config.client.server_address.as_deref() else {
        tracing::info!(
            "Searching for a server on discovery port {}",
            config.server.discovery_port
        );
        let found = discover(
            config.server.discovery_port,
            config.client.discovery_timeout(),
        )
        .await?;
        return Ok(found);
    };

    let target = if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:{}", config.server.game_port)
    };
    let resolved = tokio::net::lookup_host(target.as_str())
        .await
        .ok()
        .and_then(|mut addrs| addrs.next());
    resolved.ok_or(ClientError::InvalidServerAddress(target))
}

/// Binds a local endpoint and logs in to `server`.
pub async fn connect(
    config: &Config,
    server: SocketAddr,
) -> Result<(ServerLink, LoginAccepted), ClientError> {
    let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
    let endpoint = Endpoint::bind(local)
        .await?
        .with_max_datagram(config.network.max_datagram);

    let mut link = ServerLink::new(endpoint, server);
    let accepted = link
        .login(
            &config.client.username,
            &config.client.password,
            config.client.login_timeout(),
        )
        .await?;
    Ok((link, accepted))
}
