//! Endpoint liveness probing.
//!
//! A probe asks an endpoint for its chain id. The selector treats any error,
//! timeout, or unexpected chain id as a degraded endpoint.

use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::chain::ChainId;

/// Errors returned by a probe.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Asks an RPC endpoint which chain it serves.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    async fn chain_id(&self, url: &Url) -> Result<ChainId, ProbeError>;
}

/// Probe backed by an alloy HTTP provider (`eth_chainId`).
#[derive(Debug, Clone, Default)]
pub struct RpcProbe;

#[async_trait]
impl EndpointProbe for RpcProbe {
    async fn chain_id(&self, url: &Url) -> Result<ChainId, ProbeError> {
        let provider = ProviderBuilder::new().connect_http(url.clone());
        provider
            .get_chain_id()
            .await
            .map(ChainId)
            .map_err(|e| ProbeError::Rpc(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // Port 9 (discard) is closed on test machines; the probe must error, not panic.
        let url = Url::parse("http://127.0.0.1:9").unwrap();
        let result = RpcProbe.chain_id(&url).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().starts_with("RPC error"));
    }
}
