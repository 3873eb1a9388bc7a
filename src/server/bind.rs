// src/server/bind.rs

use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::errors::{PipelineError, Result};

/// Bind `hostname:port`, moving on to the following ports when
/// `use_available_port` is set.
///
/// At most `1 + search_limit` ports are tried. The returned address is the
/// one actually bound (useful when `port` is 0).
pub async fn bind_with_fallback(
    hostname: &str,
    port: u16,
    use_available_port: bool,
    search_limit: u16,
) -> Result<(TcpListener, SocketAddr)> {
    let ip = resolve_host(hostname).await?;
    let first = SocketAddr::new(ip, port);
    let extra = if use_available_port { search_limit } else { 0 };

    let mut attempts = 0u16;
    for offset in 0..=extra {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        attempts += 1;
        let addr = SocketAddr::new(ip, candidate);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                let bound = listener.local_addr()?;
                if offset > 0 {
                    info!(requested = port, bound = bound.port(), "port in use; using the next free one");
                }
                return Ok((listener, bound));
            }
            Err(err) => {
                debug!(%addr, error = %err, "bind failed");
            }
        }
    }

    Err(PipelineError::Bind {
        addr: first,
        attempts,
    })
}

async fn resolve_host(hostname: &str) -> Result<IpAddr> {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs = tokio::net::lookup_host((hostname, 0)).await?;
    addrs
        .next()
        .map(|a| a.ip())
        .ok_or_else(|| PipelineError::Config(format!("hostname '{hostname}' did not resolve")))
}
