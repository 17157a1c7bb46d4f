#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use routecall::contract::{
    ContractRegistry, InterfaceContract, MethodContract, ParamDecl, ReturnShape,
};
use routecall::services::auth::AuthHandler;
use routecall::services::logger::Logger;
use routecall::services::request::OutgoingRequest;
use routecall::services::response::RawResponse;
use routecall::services::settings::ClientSettings;
use routecall::services::transport::Transport;
use routecall::{ClientError, RestClient};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const BASE_URL: &str = "http://api.test/";

#[derive(Default)]
pub struct MockTransport {
    queue: StdMutex<VecDeque<Result<RawResponse, ClientError>>>,
    requests: StdMutex<Vec<OutgoingRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, outcome: Result<RawResponse, ClientError>) {
        self.queue.lock().expect("queue lock").push_back(outcome);
    }

    pub fn push_status(&self, status: u16) {
        self.push(Ok(RawResponse::new(
            StatusCode::from_u16(status).expect("status"),
        )));
    }

    pub fn push_body(&self, status: u16, body: &str) {
        self.push(Ok(RawResponse::new(StatusCode::from_u16(status).expect("status"))
            .with_body(body.to_string())));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_body(status, &body.to_string());
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn sends(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_request(&self) -> OutgoingRequest {
        self.requests()
            .pop()
            .expect("at least one request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ClientError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self.queue.lock().expect("queue lock").pop_front();
        next.unwrap_or_else(|| Ok(RawResponse::new(StatusCode::OK)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Succeed,
    Decline,
    Fail,
}

pub struct MockAuthHandler {
    mode: RefreshMode,
    attaches: AtomicUsize,
    refreshes: AtomicUsize,
}

impl MockAuthHandler {
    pub fn new(mode: RefreshMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            attaches: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthHandler for MockAuthHandler {
    async fn attach(&self, request: &mut OutgoingRequest) -> Result<(), ClientError> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        request.set_header("authorization", "Bearer stale-token")
    }

    async fn refresh(&self, request: &mut OutgoingRequest) -> Result<bool, ClientError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            RefreshMode::Succeed => {
                request.set_header("authorization", "Bearer fresh-token")?;
                Ok(true)
            }
            RefreshMode::Decline => Ok(false),
            RefreshMode::Fail => Err(ClientError::auth("token endpoint unavailable")),
        }
    }
}

pub fn users_interface() -> InterfaceContract {
    InterfaceContract::new("Users")
        .route_prefix("api/v1")
        .method(MethodContract::new("Get").get("users/{id}").param(ParamDecl::new("id")))
        .method(
            MethodContract::new("GetResult")
                .get("users/{id}")
                .param(ParamDecl::new("id"))
                .returns(ReturnShape::AsyncResult),
        )
        .method(
            MethodContract::new("Search")
                .get("users")
                .param(ParamDecl::new("filter")),
        )
        .method(
            MethodContract::new("Create")
                .post("users")
                .param(ParamDecl::new("user")),
        )
        .method(
            MethodContract::new("Delete")
                .delete("users/{id}")
                .param(ParamDecl::new("id"))
                .returns(ReturnShape::AsyncUnit),
        )
        .method(
            MethodContract::new("GetBlocking")
                .get("users/{id}")
                .param(ParamDecl::new("id"))
                .returns(ReturnShape::BlockingPayload),
        )
        .method(
            MethodContract::new("GetResultBlocking")
                .get("users/{id}")
                .param(ParamDecl::new("id"))
                .returns(ReturnShape::BlockingResult),
        )
        .method(
            MethodContract::new("DeleteBlocking")
                .delete("users/{id}")
                .param(ParamDecl::new("id"))
                .returns(ReturnShape::BlockingUnit),
        )
}

pub fn secure_interface() -> InterfaceContract {
    InterfaceContract::new("Secure")
        .authorize()
        .method(MethodContract::new("Me").get("me"))
        .method(MethodContract::new("Health").get("health").allow_anonymous())
}

pub fn registry() -> ContractRegistry {
    ContractRegistry::new()
        .register(users_interface())
        .register(secure_interface())
}

pub fn client_with(transport: Arc<MockTransport>, settings: ClientSettings) -> RestClient {
    client_with_registry(transport, settings, registry())
}

pub fn client_with_registry(
    transport: Arc<MockTransport>,
    settings: ClientSettings,
    registry: ContractRegistry,
) -> RestClient {
    RestClient::builder(BASE_URL)
        .settings(settings)
        .registry(registry)
        .transport(transport)
        .logger(Logger::in_memory("test"))
        .build()
        .expect("client")
}

pub struct HttpStub {
    pub addr: SocketAddr,
    pub requests: Arc<StdMutex<Vec<String>>>,
}

impl HttpStub {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("stub lock").clone()
    }
}

pub async fn spawn_http_stub(responses: Vec<String>) -> HttpStub {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let requests = Arc::new(StdMutex::new(Vec::new()));
    let captured = requests.clone();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let raw = read_request(&mut socket).await;
            captured.lock().expect("stub lock").push(raw);
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    HttpStub { addr, requests }
}

pub async fn spawn_routed_stub<F>(route: F) -> HttpStub
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let requests = Arc::new(StdMutex::new(Vec::new()));
    let captured = requests.clone();
    let route = Arc::new(route);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let captured = captured.clone();
            let route = route.clone();
            tokio::spawn(async move {
                let raw = read_request(&mut socket).await;
                let response = (route.as_ref())(&raw);
                captured.lock().expect("stub lock").push(raw);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    HttpStub { addr, requests }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let chunked = text[..head_end]
                .to_ascii_lowercase()
                .contains("transfer-encoding: chunked");
            if chunked {
                if text.ends_with("0\r\n\r\n") {
                    break;
                }
                continue;
            }
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

pub fn http_response(status: u16, reason: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        content_type,
        body.len(),
        body
    )
}
