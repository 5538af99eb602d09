//! Chain id → transport resolution with ordered failover.
//!
//! # Algorithm
//! ```text
//! resolve(chain):
//!     cached endpoint?  → return it (no probe)
//!     else probe rpc_urls in priority order
//!         error / timeout / wrong chain id → mark degraded, advance
//!         first match → cache, return
//!     none matched → NoHealthyEndpoint
//!
//! report_failure(transport):
//!     failure_threshold consecutive failures on the cached endpoint
//!     → drop cache entry, next resolve re-probes from the top
//! ```

use alloy::providers::{Provider, ProviderBuilder};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::chain::{Chain, ChainId, ChainRegistry};
use crate::config::TransportConfig;
use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::transport::endpoint::{Endpoint, EndpointHealth};
use crate::transport::probe::EndpointProbe;

/// A resolved network transport bound to exactly one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    chain_id: ChainId,
    url: Url,
    endpoint_index: usize,
    request_timeout: Duration,
}

impl Transport {
    pub fn new(chain_id: ChainId, url: Url, endpoint_index: usize, request_timeout: Duration) -> Self {
        Self {
            chain_id,
            url,
            endpoint_index,
            request_timeout,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Position of the endpoint in the chain's priority list.
    pub fn endpoint_index(&self) -> usize {
        self.endpoint_index
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Build an alloy HTTP provider for downstream callers.
    pub fn provider(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.url.clone())
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedEndpoint {
    index: usize,
    failures: u32,
}

/// Resolves transports for registered chains.
pub struct TransportSelector {
    registry: Arc<ChainRegistry>,
    probe: Arc<dyn EndpointProbe>,
    config: TransportConfig,
    endpoints: HashMap<ChainId, Vec<Arc<Endpoint>>>,
    cache: DashMap<ChainId, CachedEndpoint>,
}

impl TransportSelector {
    /// Create a selector over every chain in the registry.
    pub fn new(
        registry: Arc<ChainRegistry>,
        probe: Arc<dyn EndpointProbe>,
        config: TransportConfig,
    ) -> Self {
        let endpoints = registry
            .iter()
            .map(|chain| {
                let list = chain
                    .rpc_urls
                    .iter()
                    .cloned()
                    .map(|url| Arc::new(Endpoint::new(url)))
                    .collect();
                (chain.id, list)
            })
            .collect();

        Self {
            registry,
            probe,
            config,
            endpoints,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    /// Resolve a transport for `chain_id`.
    pub async fn resolve(&self, chain_id: ChainId) -> WalletResult<Transport> {
        let chain = self.registry.get(chain_id)?;

        let cached = self.cache.get(&chain_id).map(|entry| entry.index);
        if let Some(index) = cached {
            return self.transport_for(chain, index);
        }

        self.probe_from_top(chain).await
    }

    /// Resolve, re-checking a cached endpoint before handing it out.
    ///
    /// A failed check counts as a reported failure, so a dead cached endpoint
    /// is dropped after `failure_threshold` checks and the endpoint list is
    /// walked again from the top within the same call.
    pub async fn resolve_verified(&self, chain_id: ChainId) -> WalletResult<Transport> {
        let chain = self.registry.get(chain_id)?;

        for _ in 0..self.config.failure_threshold.max(1) {
            let Some(index) = self.cached_endpoint(chain_id) else {
                break;
            };
            let transport = self.transport_for(chain, index)?;
            if self.check(&transport).await {
                return Ok(transport);
            }
        }

        self.invalidate(chain_id);
        self.probe_from_top(chain).await
    }

    /// Ask the endpoint behind `transport` for its chain id and report the
    /// outcome. Returns whether it is still serving the right chain.
    pub async fn check(&self, transport: &Transport) -> bool {
        let answer = timeout(self.config.probe_timeout(), self.probe.chain_id(transport.url())).await;
        match answer {
            Ok(Ok(reported)) if reported == transport.chain_id => {
                self.report_success(transport);
                true
            }
            other => {
                let outcome = match other {
                    Ok(Ok(_)) => "chain_mismatch",
                    Ok(Err(_)) => "error",
                    Err(_) => "timeout",
                };
                metrics::record_probe(transport.chain_id, outcome);
                tracing::debug!(
                    chain_id = %transport.chain_id,
                    url = %transport.url,
                    outcome,
                    "Cached RPC endpoint failed re-check"
                );
                self.report_failure(transport);
                false
            }
        }
    }

    /// Report that a request over `transport` failed.
    pub fn report_failure(&self, transport: &Transport) {
        if let Some(endpoint) = self.endpoint(transport.chain_id, transport.endpoint_index) {
            endpoint.mark_failure();
            metrics::record_endpoint_health(transport.chain_id, endpoint.url.as_str(), false);
        }

        if let Entry::Occupied(mut entry) = self.cache.entry(transport.chain_id) {
            if entry.get().index != transport.endpoint_index {
                return;
            }
            entry.get_mut().failures += 1;
            let failures = entry.get().failures;
            if failures >= self.config.failure_threshold {
                entry.remove();
                metrics::record_cache_invalidation(transport.chain_id);
                tracing::warn!(
                    chain_id = %transport.chain_id,
                    url = %transport.url,
                    failures,
                    "Cached RPC endpoint invalidated, re-probing on next resolve"
                );
            } else {
                tracing::debug!(
                    chain_id = %transport.chain_id,
                    url = %transport.url,
                    failures,
                    "Cached RPC endpoint failure"
                );
            }
        }
    }

    /// Report that a request over `transport` succeeded.
    pub fn report_success(&self, transport: &Transport) {
        if let Some(endpoint) = self.endpoint(transport.chain_id, transport.endpoint_index) {
            endpoint.mark_success();
        }
        if let Some(mut entry) = self.cache.get_mut(&transport.chain_id) {
            if entry.index == transport.endpoint_index {
                entry.failures = 0;
            }
        }
    }

    /// Drop the cached endpoint for a chain.
    pub fn invalidate(&self, chain_id: ChainId) {
        if self.cache.remove(&chain_id).is_some() {
            metrics::record_cache_invalidation(chain_id);
        }
    }

    /// Index of the cached endpoint, if any.
    pub fn cached_endpoint(&self, chain_id: ChainId) -> Option<usize> {
        self.cache.get(&chain_id).map(|entry| entry.index)
    }

    /// Health of every endpoint of a chain, in priority order.
    pub fn endpoint_health(&self, chain_id: ChainId) -> WalletResult<Vec<EndpointHealth>> {
        self.registry.get(chain_id)?;
        Ok(self
            .endpoints
            .get(&chain_id)
            .map(|list| list.iter().map(|e| e.health()).collect())
            .unwrap_or_default())
    }

    async fn probe_from_top(&self, chain: &Chain) -> WalletResult<Transport> {
        let endpoints = self
            .endpoints
            .get(&chain.id)
            .ok_or(WalletError::NoHealthyEndpoint(chain.id))?;
        let probe_timeout = self.config.probe_timeout();

        for (index, endpoint) in endpoints.iter().enumerate() {
            match timeout(probe_timeout, self.probe.chain_id(&endpoint.url)).await {
                Ok(Ok(reported)) if reported == chain.id => {
                    endpoint.mark_success();
                    metrics::record_probe(chain.id, "healthy");
                    metrics::record_endpoint_health(chain.id, endpoint.url.as_str(), true);
                    self.cache.insert(chain.id, CachedEndpoint { index, failures: 0 });
                    tracing::info!(
                        chain_id = %chain.id,
                        url = %endpoint.url,
                        endpoint_idx = index,
                        "RPC endpoint selected"
                    );
                    return self.transport_for(chain, index);
                }
                Ok(Ok(reported)) => {
                    tracing::warn!(
                        chain_id = %chain.id,
                        reported = %reported,
                        url = %endpoint.url,
                        "RPC endpoint serves a different chain, trying next endpoint"
                    );
                    metrics::record_probe(chain.id, "chain_mismatch");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        chain_id = %chain.id,
                        url = %endpoint.url,
                        error = %e,
                        "RPC error, trying next endpoint"
                    );
                    metrics::record_probe(chain.id, "error");
                }
                Err(_) => {
                    tracing::warn!(
                        chain_id = %chain.id,
                        url = %endpoint.url,
                        "RPC timeout, trying next endpoint"
                    );
                    metrics::record_probe(chain.id, "timeout");
                }
            }
            endpoint.mark_failure();
            metrics::record_endpoint_health(chain.id, endpoint.url.as_str(), false);
        }

        tracing::error!(chain_id = %chain.id, endpoints = endpoints.len(), "All RPC endpoints failed");
        Err(WalletError::NoHealthyEndpoint(chain.id))
    }

    fn transport_for(&self, chain: &Chain, index: usize) -> WalletResult<Transport> {
        let url = chain
            .rpc_urls
            .get(index)
            .cloned()
            .ok_or(WalletError::NoHealthyEndpoint(chain.id))?;
        Ok(Transport::new(chain.id, url, index, self.config.request_timeout()))
    }

    fn endpoint(&self, chain_id: ChainId, index: usize) -> Option<&Arc<Endpoint>> {
        self.endpoints.get(&chain_id).and_then(|list| list.get(index))
    }
}

impl std::fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSelector")
            .field("chains", &self.registry.ids())
            .field("failure_threshold", &self.config.failure_threshold)
            .finish()
    }
}
