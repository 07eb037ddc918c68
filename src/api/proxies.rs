// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Trusted proxy list and client address resolution
//!
//! Forwarding headers are only honoured when the connecting peer is trusted.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use thiserror::Error;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid trusted proxy '{entry}': {reason}")]
pub struct ProxyError {
    pub entry: String,
    pub reason: String,
}

/// One trusted network, stored with its host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyNet {
    network: IpAddr,
    prefix: u8,
}

impl ProxyNet {
    /// Parse a bare IP address or a CIDR such as `10.0.0.0/8`
    pub fn parse(entry: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (addr, prefix) = match entry.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (entry.trim(), None),
        };

        let addr: IpAddr = addr.parse().map_err(|_| invalid("not an IP address"))?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix = match prefix {
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max)
                .ok_or_else(|| invalid("prefix length out of range"))?,
            None => max,
        };

        Ok(ProxyNet {
            network: mask(addr, prefix),
            prefix,
        })
    }

    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(ip, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V4((bits & mask).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V6((bits & mask).into())
        }
    }
}

/// Which peers may set the client address through forwarding headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrustedProxies {
    /// No trust list applied; forwarding headers are taken from any peer
    #[default]
    All,
    List(Vec<ProxyNet>),
}

impl TrustedProxies {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ProxyError> {
        entries
            .iter()
            .map(|e| ProxyNet::parse(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(TrustedProxies::List)
    }

    #[must_use]
    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        match self {
            TrustedProxies::All => true,
            TrustedProxies::List(nets) => nets.iter().any(|net| net.contains(ip)),
        }
    }

    /// Resolve the originating client for a request received from `peer`
    ///
    /// `X-Forwarded-For` is walked right to left and the first untrusted hop
    /// wins; `X-Real-IP` is used when there is no usable forwarded chain.
    #[must_use]
    pub fn client_ip(&self, peer: IpAddr, headers: &HeaderMap) -> IpAddr {
        if !self.is_trusted(peer) {
            return peer;
        }

        let chain: Vec<IpAddr> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|hop| hop.trim().parse().ok())
            .collect();

        if let Some(last) = chain.iter().rev().find(|ip| !self.is_trusted(**ip)) {
            return *last;
        }
        if let Some(first) = chain.first() {
            return *first;
        }

        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(peer)
    }
}

/// Resolved originating client address, available as a request extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Middleware attaching [`ClientIp`] to every request with a known peer
pub async fn resolve_client_ip(
    State(proxies): State<Arc<TrustedProxies>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(peer) = peer {
        let client = proxies.client_ip(peer, request.headers());
        request.extensions_mut().insert(ClientIp(client));
    }

    next.run(request).await
}
