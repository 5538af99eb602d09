//! Shared utilities for integration tests.
#![allow(dead_code)]

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use piggybank_connect::chain::{Chain, ChainId, ChainRegistry};
use piggybank_connect::config::{SessionConfig, TransportConfig};
use piggybank_connect::connector::{
    Connection, Connector, ConnectorError, ConnectorKind, ConnectorSet, HandshakeContext,
    WalletEvent, WalletEventSink,
};
use piggybank_connect::session::{Session, SessionHandle, SessionManager, SessionStatus};
use piggybank_connect::storage::SessionStore;
use piggybank_connect::transport::{EndpointProbe, ProbeError, TransportSelector};

pub const MAINNET: ChainId = ChainId(1);
pub const SEPOLIA: ChainId = ChainId(11_155_111);

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Mainnet and sepolia with one fake endpoint each. The endpoint path is the
/// chain id it reports to [`PathProbe`].
pub fn test_chains() -> Vec<Chain> {
    vec![
        Chain::mainnet().with_rpc_urls(vec![rpc_url("mainnet", MAINNET)]),
        Chain::sepolia().with_rpc_urls(vec![rpc_url("sepolia", SEPOLIA)]),
    ]
}

pub fn rpc_url(host: &str, reports: ChainId) -> Url {
    Url::parse(&format!("http://{}.rpc.test/{}", host, reports.0)).unwrap()
}

/// Probe answering with the chain id encoded in the URL path.
#[derive(Default)]
pub struct PathProbe {
    down: Mutex<HashSet<String>>,
}

impl PathProbe {
    pub fn set_down(&self, url: &Url) {
        self.down.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl EndpointProbe for PathProbe {
    async fn chain_id(&self, url: &Url) -> Result<ChainId, ProbeError> {
        if self.down.lock().unwrap().contains(url.as_str()) {
            return Err(ProbeError::Rpc("connection refused".into()));
        }
        url.path()
            .trim_start_matches('/')
            .parse::<u64>()
            .map(ChainId)
            .map_err(|e| ProbeError::Rpc(e.to_string()))
    }
}

/// One scripted connector answer.
pub enum Step<T> {
    Reply(Result<T, ConnectorError>),
    /// Wait, then answer.
    Delay(Duration, Result<T, ConnectorError>),
    /// Push a wallet event through the handshake sink, then answer.
    EmitThen(WalletEvent, Result<T, ConnectorError>),
    /// Never answer.
    Hang,
}

/// Connector whose answers are scripted per call. With an empty script every
/// call succeeds with `account` on the requested chain.
pub struct MockConnector {
    id: String,
    account: Address,
    connect_script: Mutex<VecDeque<Step<Connection>>>,
    restore_script: Mutex<VecDeque<Step<Option<Connection>>>>,
    switch_script: Mutex<VecDeque<Step<()>>>,
    sign_script: Mutex<VecDeque<Step<Bytes>>>,
    sink: Mutex<Option<WalletEventSink>>,
    pub prompts: AtomicUsize,
    pub restores: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub releases: AtomicUsize,
}

impl MockConnector {
    pub fn new(id: &str, account: Address) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            account,
            connect_script: Mutex::new(VecDeque::new()),
            restore_script: Mutex::new(VecDeque::new()),
            switch_script: Mutex::new(VecDeque::new()),
            sign_script: Mutex::new(VecDeque::new()),
            sink: Mutex::new(None),
            prompts: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    pub fn on_connect(&self, step: Step<Connection>) {
        self.connect_script.lock().unwrap().push_back(step);
    }

    pub fn on_restore(&self, step: Step<Option<Connection>>) {
        self.restore_script.lock().unwrap().push_back(step);
    }

    pub fn on_switch(&self, step: Step<()>) {
        self.switch_script.lock().unwrap().push_back(step);
    }

    pub fn on_sign(&self, step: Step<Bytes>) {
        self.sign_script.lock().unwrap().push_back(step);
    }

    /// The sink handed over by the latest handshake or restore.
    pub fn sink(&self) -> WalletEventSink {
        self.sink.lock().unwrap().clone().expect("no handshake yet")
    }

    pub fn emit(&self, event: WalletEvent) -> bool {
        self.sink().emit(event)
    }

    fn connection(&self, chain_id: ChainId) -> Connection {
        Connection {
            accounts: vec![self.account],
            chain_id,
        }
    }

    async fn play<T>(&self, step: Option<Step<T>>, default: T, sink: Option<&WalletEventSink>) -> Result<T, ConnectorError> {
        match step {
            None => Ok(default),
            Some(Step::Reply(result)) => result,
            Some(Step::Delay(delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            Some(Step::EmitThen(event, result)) => {
                if let Some(sink) = sink {
                    sink.emit(event);
                }
                result
            }
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Wallet"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Injected
    }

    async fn request_accounts(&self, ctx: &HandshakeContext) -> Result<Connection, ConnectorError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(ctx.events.clone());
        let step = self.connect_script.lock().unwrap().pop_front();
        self.play(step, self.connection(ctx.chain.id), Some(&ctx.events)).await
    }

    async fn restore(&self, ctx: &HandshakeContext) -> Result<Option<Connection>, ConnectorError> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(ctx.events.clone());
        let step = self.restore_script.lock().unwrap().pop_front();
        self.play(step, Some(self.connection(ctx.chain.id)), Some(&ctx.events)).await
    }

    async fn sign_request(&self, account: Address, message: &[u8]) -> Result<Bytes, ConnectorError> {
        let mut signed = account.to_vec();
        signed.extend_from_slice(message);
        let step = self.sign_script.lock().unwrap().pop_front();
        self.play(step, Bytes::from(signed), None).await
    }

    async fn switch_chain(&self, _chain: &Chain) -> Result<(), ConnectorError> {
        let step = self.switch_script.lock().unwrap().pop_front();
        self.play(step, (), None).await
    }

    async fn teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session timeouts short enough for tests.
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        connect_timeout_secs: 5,
        reconnect_timeout_secs: 1,
        reconnect_attempts: 3,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 50,
        request_timeout_secs: 2,
        event_buffer: 64,
    }
}

pub fn selector_with(probe: Arc<dyn EndpointProbe>) -> Arc<TransportSelector> {
    let registry = Arc::new(ChainRegistry::from_chains(test_chains()).unwrap());
    Arc::new(TransportSelector::new(registry, probe, TransportConfig::default()))
}

pub fn start_manager(connector: Arc<dyn Connector>, store: Arc<dyn SessionStore>) -> SessionManager {
    start_manager_with(connector, store, Arc::new(PathProbe::default()), fast_session_config())
}

pub fn start_manager_with(
    connector: Arc<dyn Connector>,
    store: Arc<dyn SessionStore>,
    probe: Arc<dyn EndpointProbe>,
    config: SessionConfig,
) -> SessionManager {
    let set = ConnectorSet::new().with(connector).unwrap();
    SessionManager::start(selector_with(probe), set, store, config)
}

/// Like [`start_manager`], on a caller-supplied chain list.
pub fn start_manager_on(
    chains: Vec<Chain>,
    connector: Arc<dyn Connector>,
    store: Arc<dyn SessionStore>,
    probe: Arc<dyn EndpointProbe>,
) -> SessionManager {
    let registry = Arc::new(ChainRegistry::from_chains(chains).unwrap());
    let selector = Arc::new(TransportSelector::new(registry, probe, TransportConfig::default()));
    let set = ConnectorSet::new().with(connector).unwrap();
    SessionManager::start(selector, set, store, fast_session_config())
}

/// Wait for `status`, failing the test instead of hanging.
pub async fn wait_status(handle: &SessionHandle, status: SessionStatus) -> Session {
    tokio::time::timeout(Duration::from_secs(30), handle.wait_for_status(status))
        .await
        .unwrap_or_else(|_| panic!("session never reached {}, last {:?}", status, handle.snapshot()))
        .unwrap()
}

/// Let the actor drain everything queued so far. Relies on a switch to the
/// current chain being a queued no-op.
pub async fn settle(handle: &SessionHandle) {
    if let Some(chain_id) = handle.snapshot().chain_id {
        let _ = handle.switch_chain(chain_id).await;
    } else {
        let _ = handle.switch_chain(MAINNET).await;
    }
}

/// Minimal HTTP/1.1 JSON-RPC server. `handler` gets `(method, params)` and the
/// request headers, and returns a result or `(code, message)` error.
pub async fn start_rpc_server<F, Fut>(handler: F) -> Url
where
    F: Fn(String, Value, Vec<(String, String)>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, (i64, String)>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let (head_len, content_length, headers) = loop {
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                        let headers: Vec<(String, String)> = head
                            .lines()
                            .skip(1)
                            .filter_map(|line| line.split_once(':'))
                            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                            .collect();
                        let length = headers
                            .iter()
                            .find(|(k, _)| k == "content-length")
                            .and_then(|(_, v)| v.parse::<usize>().ok())
                            .unwrap_or(0);
                        break (pos + 4, length, headers);
                    }
                };
                while buf.len() < head_len + content_length {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request: Value =
                    serde_json::from_slice(&buf[head_len..head_len + content_length]).unwrap_or(Value::Null);
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let id = request["id"].clone();
                let params = request["params"].clone();

                let body = match handler(method, params, headers).await {
                    Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                    Err((code, message)) => {
                        json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
                    }
                }
                .to_string();

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Url::parse(&format!("http://{}/", addr)).unwrap()
}
