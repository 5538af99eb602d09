//! Chain identifiers and network metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ChainId {
    /// Hex quantity form used by EIP-1193 (`0x1`, `0xaa36a7`).
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parse a hex quantity (`0x...`) or decimal string.
    pub fn parse_quantity(s: &str) -> Option<Self> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(Self),
            None => s.parse().ok().map(Self),
        }
    }
}

/// Native gas currency of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    /// Ether, the currency of mainnet and its public testnets.
    pub fn ether() -> Self {
        Self {
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// A supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Globally unique chain id.
    pub id: ChainId,

    /// Display name.
    pub name: String,

    /// Native currency metadata.
    pub native_currency: NativeCurrency,

    /// RPC endpoints in priority order (first healthy wins).
    pub rpc_urls: Vec<Url>,

    /// Block explorer shown to users when the wallet adds the chain.
    #[serde(default)]
    pub block_explorer: Option<Url>,

    /// Whether this is a test network.
    #[serde(default)]
    pub testnet: bool,
}

impl Chain {
    /// Ethereum mainnet with its default public endpoints.
    pub fn mainnet() -> Self {
        Self {
            id: ChainId(1),
            name: "Ethereum".to_string(),
            native_currency: NativeCurrency::ether(),
            rpc_urls: vec![
                builtin_url("https://eth.merkle.io"),
                builtin_url("https://cloudflare-eth.com"),
            ],
            block_explorer: Some(builtin_url("https://etherscan.io")),
            testnet: false,
        }
    }

    /// Sepolia testnet with its default public endpoints.
    pub fn sepolia() -> Self {
        Self {
            id: ChainId(11_155_111),
            name: "Sepolia".to_string(),
            native_currency: NativeCurrency {
                name: "Sepolia Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![
                builtin_url("https://sepolia.drpc.org"),
                builtin_url("https://rpc.sepolia.org"),
            ],
            block_explorer: Some(builtin_url("https://sepolia.etherscan.io")),
            testnet: true,
        }
    }

    /// Replace the endpoint list.
    pub fn with_rpc_urls(mut self, urls: Vec<Url>) -> Self {
        self.rpc_urls = urls;
        self
    }
}

fn builtin_url(s: &str) -> Url {
    Url::parse(s).expect("builtin chain URL is valid")
}
