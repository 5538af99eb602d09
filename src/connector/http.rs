//! EIP-1193 requests over HTTP JSON-RPC, for remote signers.
//!
//! The project id is opaque: it is forwarded as the `x-project-id` header and
//! never interpreted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use crate::connector::eip1193::{Eip1193Provider, ProviderRpcError};

/// Header carrying the project id.
pub const PROJECT_ID_HEADER: &str = "x-project-id";

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client speaking to a remote signer.
#[derive(Debug)]
pub struct HttpEip1193Provider {
    client: Client,
    url: Url,
    project_id: Option<String>,
    next_id: AtomicU64,
}

impl HttpEip1193Provider {
    pub fn new(url: Url, project_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            project_id,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Eip1193Provider for HttpEip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(self.url.clone()).json(&body);
        if let Some(project_id) = &self.project_id {
            request = request.header(PROJECT_ID_HEADER, project_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderRpcError::disconnected(format!("remote signer unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderRpcError::disconnected(format!(
                "remote signer returned HTTP {}",
                status
            )));
        }

        let parsed: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderRpcError::disconnected(format!("invalid JSON-RPC response: {}", e)))?;

        match (parsed.result, parsed.error) {
            (_, Some(error)) => Err(ProviderRpcError::new(error.code, error.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}
