//! EIP-1193 wallet connector.
//!
//! Speaks the standard provider request interface: `eth_requestAccounts`,
//! `eth_accounts`, `eth_chainId`, `wallet_switchEthereumChain`,
//! `wallet_addEthereumChain`, `personal_sign`. The same connector serves
//! browser-injected wallets (host glue supplies the provider) and remote signers
//! (`HttpEip1193Provider`).

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::chain::{Chain, ChainId};
use crate::connector::http::HttpEip1193Provider;
use crate::connector::{
    Connection, Connector, ConnectorError, ConnectorKind, HandshakeContext, WalletEventSink,
};

/// Error object returned by an EIP-1193 provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The provider is unreachable.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(Self::DISCONNECTED, message)
    }
}

/// An EIP-1193 request interface.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Start forwarding `accountsChanged` / `chainChanged` / `disconnect` to `sink`.
    /// Providers without push events keep the default.
    fn set_event_sink(&self, _sink: WalletEventSink) {}

    /// Stop forwarding events.
    fn clear_event_sink(&self) {}
}

/// Connector over any [`Eip1193Provider`].
pub struct Eip1193Connector {
    id: String,
    name: String,
    kind: ConnectorKind,
    provider: Arc<dyn Eip1193Provider>,
}

impl Eip1193Connector {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ConnectorKind,
        provider: Arc<dyn Eip1193Provider>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            provider,
        }
    }

    /// Browser-injected wallet behind host-supplied glue.
    pub fn injected(id: impl Into<String>, name: impl Into<String>, provider: Arc<dyn Eip1193Provider>) -> Self {
        Self::new(id, name, ConnectorKind::Injected, provider)
    }

    /// Remote signer reached over HTTP JSON-RPC.
    pub fn remote_signer(
        id: impl Into<String>,
        name: impl Into<String>,
        url: Url,
        project_id: Option<String>,
    ) -> Self {
        let provider = Arc::new(HttpEip1193Provider::new(url, project_id));
        Self::new(id, name, ConnectorKind::RemoteSigner, provider)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ConnectorError> {
        self.provider.request(method, params).await.map_err(|e| {
            tracing::debug!(connector = %self.id, method, code = e.code, "Provider request failed");
            map_provider_error(e)
        })
    }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, ConnectorError> {
        let value = self.call(method, json!([])).await?;
        parse_accounts(&value)
    }

    async fn chain_id(&self) -> Result<ChainId, ConnectorError> {
        let value = self.call("eth_chainId", json!([])).await?;
        parse_chain_id(&value)
    }

    async fn add_chain(&self, chain: &Chain) -> Result<(), ConnectorError> {
        let params = json!([{
            "chainId": chain.id.to_hex(),
            "chainName": chain.name,
            "nativeCurrency": {
                "name": chain.native_currency.name,
                "symbol": chain.native_currency.symbol,
                "decimals": chain.native_currency.decimals,
            },
            "rpcUrls": chain.rpc_urls.iter().map(Url::as_str).collect::<Vec<_>>(),
            "blockExplorerUrls": chain.block_explorer.iter().map(Url::as_str).collect::<Vec<_>>(),
        }]);
        self.call("wallet_addEthereumChain", params).await.map(|_| ())
    }

    async fn request_switch(&self, chain_id: ChainId) -> Result<(), ProviderRpcError> {
        self.provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_id.to_hex() }]))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Connector for Eip1193Connector {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn request_accounts(&self, ctx: &HandshakeContext) -> Result<Connection, ConnectorError> {
        self.provider.set_event_sink(ctx.events.clone());

        let accounts = self.accounts("eth_requestAccounts").await?;
        if accounts.is_empty() {
            return Err(ConnectorError::NoAccounts);
        }

        let mut chain_id = self.chain_id().await?;
        if chain_id != ctx.chain.id {
            match self.switch_chain(&ctx.chain).await {
                Ok(()) => chain_id = ctx.chain.id,
                Err(ConnectorError::UserRejected) => return Err(ConnectorError::UserRejected),
                Err(e) => {
                    tracing::warn!(
                        connector = %self.id,
                        wallet_chain = %chain_id,
                        requested = %ctx.chain.id,
                        error = %e,
                        "Wallet stayed on its current chain"
                    );
                }
            }
        }

        Ok(Connection { accounts, chain_id })
    }

    async fn restore(&self, ctx: &HandshakeContext) -> Result<Option<Connection>, ConnectorError> {
        let accounts = self.accounts("eth_accounts").await?;
        if accounts.is_empty() {
            return Ok(None);
        }
        let chain_id = self.chain_id().await?;
        self.provider.set_event_sink(ctx.events.clone());
        Ok(Some(Connection { accounts, chain_id }))
    }

    async fn sign_request(&self, account: Address, message: &[u8]) -> Result<Bytes, ConnectorError> {
        let params = json!([alloy::hex::encode_prefixed(message), account.to_string()]);
        let value = self.call("personal_sign", params).await?;
        value
            .as_str()
            .and_then(|s| s.parse::<Bytes>().ok())
            .ok_or_else(|| ConnectorError::Communication(format!("invalid signature response: {}", value)))
    }

    async fn switch_chain(&self, chain: &Chain) -> Result<(), ConnectorError> {
        match self.request_switch(chain.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.code == ProviderRpcError::UNRECOGNIZED_CHAIN => {
                tracing::info!(connector = %self.id, chain_id = %chain.id, "Wallet does not know chain, adding it");
                match self.add_chain(chain).await {
                    Ok(()) => {}
                    Err(ConnectorError::UserRejected) => return Err(ConnectorError::UserRejected),
                    Err(_) => return Err(ConnectorError::ChainNotAdded(chain.id)),
                }
                self.request_switch(chain.id).await.map_err(map_provider_error)
            }
            Err(e) => Err(map_provider_error(e)),
        }
    }

    async fn release(&self) {
        self.provider.clear_event_sink();
    }

    async fn teardown(&self) {
        self.provider.clear_event_sink();
        if let Err(e) = self
            .provider
            .request("wallet_revokePermissions", json!([{ "eth_accounts": {} }]))
            .await
        {
            tracing::debug!(connector = %self.id, error = %e, "Permission revoke not supported");
        }
    }
}

fn map_provider_error(e: ProviderRpcError) -> ConnectorError {
    match e.code {
        ProviderRpcError::USER_REJECTED => ConnectorError::UserRejected,
        _ => ConnectorError::Communication(e.to_string()),
    }
}

fn parse_accounts(value: &Value) -> Result<Vec<Address>, ConnectorError> {
    let list = value
        .as_array()
        .ok_or_else(|| ConnectorError::Communication(format!("expected account list, got {}", value)))?;
    list.iter()
        .map(|v| {
            v.as_str()
                .and_then(|s| s.parse::<Address>().ok())
                .ok_or_else(|| ConnectorError::Communication(format!("invalid account {}", v)))
        })
        .collect()
}

fn parse_chain_id(value: &Value) -> Result<ChainId, ConnectorError> {
    let parsed = match value {
        Value::String(s) => ChainId::parse_quantity(s),
        Value::Number(n) => n.as_u64().map(ChainId),
        _ => None,
    };
    parsed.ok_or_else(|| ConnectorError::Communication(format!("invalid chain id {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::command::Command;
    use crate::transport::Transport;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Replays scripted answers and records every request.
    #[derive(Default)]
    struct ScriptedProvider {
        answers: Mutex<VecDeque<(String, Result<Value, ProviderRpcError>)>>,
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedProvider {
        fn with(answers: Vec<(&str, Result<Value, ProviderRpcError>)>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().map(|(m, r)| (m.to_string(), r)).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn methods(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl Eip1193Provider for ScriptedProvider {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
            self.requests.lock().unwrap().push((method.to_string(), params));
            let mut answers = self.answers.lock().unwrap();
            match answers.front() {
                Some((m, _)) if m == method => answers.pop_front().map(|(_, r)| r).unwrap(),
                _ => Err(ProviderRpcError::new(ProviderRpcError::UNSUPPORTED_METHOD, "unsupported")),
            }
        }
    }

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000ab";

    fn ctx(chain: Chain) -> HandshakeContext {
        let (tx, _rx) = mpsc::unbounded_channel::<Command>();
        HandshakeContext {
            transport: Transport::new(chain.id, chain.rpc_urls[0].clone(), 0, Duration::from_secs(1)),
            chain,
            events: WalletEventSink::new(1, tx),
        }
    }

    fn connector(provider: Arc<ScriptedProvider>) -> Eip1193Connector {
        Eip1193Connector::injected("injected", "Browser Wallet", provider)
    }

    #[tokio::test]
    async fn test_request_accounts_on_requested_chain() {
        let provider = ScriptedProvider::with(vec![
            ("eth_requestAccounts", Ok(json!([ACCOUNT]))),
            ("eth_chainId", Ok(json!("0x1"))),
        ]);
        let conn = connector(provider.clone())
            .request_accounts(&ctx(Chain::mainnet()))
            .await
            .unwrap();
        assert_eq!(conn.account(), Some(ACCOUNT.parse().unwrap()));
        assert_eq!(conn.chain_id, ChainId(1));
        assert_eq!(provider.methods(), vec!["eth_requestAccounts", "eth_chainId"]);
    }

    #[tokio::test]
    async fn test_request_accounts_switches_chain() {
        let provider = ScriptedProvider::with(vec![
            ("eth_requestAccounts", Ok(json!([ACCOUNT]))),
            ("eth_chainId", Ok(json!("0x1"))),
            ("wallet_switchEthereumChain", Ok(Value::Null)),
        ]);
        let conn = connector(provider.clone())
            .request_accounts(&ctx(Chain::sepolia()))
            .await
            .unwrap();
        assert_eq!(conn.chain_id, ChainId(11_155_111));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[2].1, json!([{ "chainId": "0xaa36a7" }]));
    }

    #[tokio::test]
    async fn test_user_rejection() {
        let provider = ScriptedProvider::with(vec![(
            "eth_requestAccounts",
            Err(ProviderRpcError::new(4001, "User rejected the request.")),
        )]);
        let err = connector(provider)
            .request_accounts(&ctx(Chain::mainnet()))
            .await
            .unwrap_err();
        assert_eq!(err, ConnectorError::UserRejected);
    }

    #[tokio::test]
    async fn test_restore_without_authorization() {
        let provider = ScriptedProvider::with(vec![("eth_accounts", Ok(json!([])))]);
        let restored = connector(provider.clone()).restore(&ctx(Chain::mainnet())).await.unwrap();
        assert!(restored.is_none());
        // Silent probe: never prompts.
        assert!(!provider.methods().contains(&"eth_requestAccounts".to_string()));
    }

    #[tokio::test]
    async fn test_switch_adds_unknown_chain() {
        let provider = ScriptedProvider::with(vec![
            (
                "wallet_switchEthereumChain",
                Err(ProviderRpcError::new(ProviderRpcError::UNRECOGNIZED_CHAIN, "Unrecognized chain")),
            ),
            ("wallet_addEthereumChain", Ok(Value::Null)),
            ("wallet_switchEthereumChain", Ok(Value::Null)),
        ]);
        connector(provider.clone()).switch_chain(&Chain::sepolia()).await.unwrap();

        let requests = provider.requests.lock().unwrap();
        let add = &requests[1].1[0];
        assert_eq!(add["chainId"], "0xaa36a7");
        assert_eq!(add["nativeCurrency"]["decimals"], 18);
        assert_eq!(add["blockExplorerUrls"][0], "https://sepolia.etherscan.io/");
    }

    #[tokio::test]
    async fn test_switch_rejected() {
        let provider = ScriptedProvider::with(vec![(
            "wallet_switchEthereumChain",
            Err(ProviderRpcError::new(4001, "rejected")),
        )]);
        let err = connector(provider).switch_chain(&Chain::sepolia()).await.unwrap_err();
        assert_eq!(err, ConnectorError::UserRejected);
    }

    #[tokio::test]
    async fn test_sign_request() {
        let signature = format!("0x{}", "11".repeat(65));
        let provider = ScriptedProvider::with(vec![("personal_sign", Ok(json!(signature)))]);
        let account: Address = ACCOUNT.parse().unwrap();

        let sig = connector(provider.clone()).sign_request(account, b"hello").await.unwrap();
        assert_eq!(sig.len(), 65);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].1[0], "0x68656c6c6f");
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let provider = ScriptedProvider::with(vec![]);
        let connector = connector(provider.clone());
        connector.teardown().await;
        connector.teardown().await;
        assert_eq!(provider.methods().len(), 2);
    }

    #[tokio::test]
    async fn test_release_keeps_permissions() {
        let provider = ScriptedProvider::with(vec![]);
        let connector = connector(provider.clone());
        connector.release().await;
        assert!(provider.methods().is_empty());

        connector.teardown().await;
        assert_eq!(provider.methods(), vec!["wallet_revokePermissions"]);
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id(&json!("0xaa36a7")).unwrap(), ChainId(11_155_111));
        assert_eq!(parse_chain_id(&json!(1)).unwrap(), ChainId(1));
        assert!(parse_chain_id(&json!(null)).is_err());
    }
}
