//! In-process private key connector.
//!
//! # Security
//! - Private keys are loaded only from environment variables or explicit strings
//! - Keys are never logged or serialized
//!
//! Chain switches always succeed: a raw key is not bound to a network.

use alloy::primitives::{Address, Bytes};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::chain::{Chain, ChainId};
use crate::connector::{Connection, Connector, ConnectorError, ConnectorKind, HandshakeContext};

/// Default environment variable for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "PIGGYBANK_LOCAL_PRIVATE_KEY";

/// Connector signing with a local key.
#[derive(Debug)]
pub struct LocalKeyConnector {
    id: String,
    signer: PrivateKeySigner,
    connected: AtomicBool,
    chain_id: AtomicU64,
}

impl LocalKeyConnector {
    /// Create a connector from a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(id: impl Into<String>, private_key_hex: &str) -> Result<Self, ConnectorError> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ConnectorError::Config(format!("Invalid private key format: {}", e)))?;

        let id = id.into();
        tracing::info!(connector = %id, address = %signer.address(), "Local key connector initialized");

        Ok(Self {
            id,
            signer,
            connected: AtomicBool::new(false),
            chain_id: AtomicU64::new(0),
        })
    }

    /// Load the key from an environment variable (`PIGGYBANK_LOCAL_PRIVATE_KEY` by default).
    pub fn from_env(id: impl Into<String>, var: Option<&str>) -> Result<Self, ConnectorError> {
        let var = var.unwrap_or(PRIVATE_KEY_ENV_VAR);
        let private_key = std::env::var(var)
            .map_err(|_| ConnectorError::Config(format!("Environment variable {} not set", var)))?;

        Self::from_private_key(id, &private_key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Chain the connector was last pointed at.
    pub fn current_chain(&self) -> Option<ChainId> {
        match self.chain_id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(ChainId(id)),
        }
    }

    fn connection(&self, chain_id: ChainId) -> Connection {
        self.chain_id.store(chain_id.0, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Connection {
            accounts: vec![self.address()],
            chain_id,
        }
    }
}

#[async_trait]
impl Connector for LocalKeyConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Local Key"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::LocalKey
    }

    async fn request_accounts(&self, ctx: &HandshakeContext) -> Result<Connection, ConnectorError> {
        Ok(self.connection(ctx.chain.id))
    }

    async fn restore(&self, ctx: &HandshakeContext) -> Result<Option<Connection>, ConnectorError> {
        Ok(Some(self.connection(ctx.chain.id)))
    }

    async fn sign_request(&self, account: Address, message: &[u8]) -> Result<Bytes, ConnectorError> {
        if account != self.address() {
            return Err(ConnectorError::Communication(format!("account {} is not managed by this key", account)));
        }
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| ConnectorError::Communication(format!("Message signing failed: {}", e)))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn switch_chain(&self, chain: &Chain) -> Result<(), ConnectorError> {
        self.chain_id.store(chain.id.0, Ordering::SeqCst);
        Ok(())
    }

    async fn teardown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.chain_id.store(0, Ordering::SeqCst);
    }
}
