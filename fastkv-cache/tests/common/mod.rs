//! In-process stand-in for the Fastly KV Store REST API.
#![allow(dead_code)]

use bytes::Bytes;
use fastkv_cache::{
    CacheError, CacheObserver, FastlyKvCache, KvStoreConfig, Operation, TtlPolicy,
};
use http_body_util::{BodyExt, Full};
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, service::service_fn,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

pub const STORE_ID: &str = "S1";
pub const TOKEN: &str = "T1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub fastly_key: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub body: Bytes,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Bytes>,
    requests: Vec<RecordedRequest>,
    forced: Option<(StatusCode, String)>,
    delay: Option<Duration>,
    redirect_to: Option<String>,
}

#[derive(Clone)]
pub struct MockKvStore {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl MockKvStore {
    /// Bind an ephemeral port and serve until the runtime goes away.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));

        let server_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let state = server_state.clone();
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(handle(req, state).await) }
                });
                tokio::spawn(async move {
                    if let Err(err) = Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        tracing::debug!(?err, "mock kv connection error");
                    }
                });
            }
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    pub fn insert(&self, key: &str, value: impl Into<Bytes>) {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(key.to_string(), value.into());
    }

    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.state.lock().unwrap().entries.get(key).cloned()
    }

    /// Answer every request with this status and body.
    pub fn fail_with(&self, status: StatusCode, body: &str) {
        self.state.lock().unwrap().forced = Some((status, body.to_string()));
    }

    pub fn delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Answer every request with a 307 to the same path on `target_base`.
    pub fn redirect_to(&self, target_base: &str) {
        self.state.lock().unwrap().redirect_to = Some(target_base.to_string());
    }

    pub fn config(&self) -> KvStoreConfig {
        KvStoreConfig::builder()
            .api_token(TOKEN)
            .store_id(STORE_ID)
            .base_url(self.base_url())
            .timeout(5u64)
            .build()
            .unwrap()
    }

    pub fn cache(&self) -> (FastlyKvCache, Arc<RecordingObserver>) {
        self.cache_with(self.config())
    }

    pub fn cache_with_policy(
        &self,
        ttl_policy: TtlPolicy,
    ) -> (FastlyKvCache, Arc<RecordingObserver>) {
        let mut config = self.config();
        config.ttl_policy = ttl_policy;
        self.cache_with(config)
    }

    pub fn cache_with(
        &self,
        config: KvStoreConfig,
    ) -> (FastlyKvCache, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let cache = FastlyKvCache::with_observer(config, observer.clone()).unwrap();
        (cache, observer)
    }
}

fn response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap()
}

fn header(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<Mutex<State>>,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let fastly_key = header(&req, "fastly-key");
    let accept = header(&req, "accept");
    let content_type = header(&req, "content-type");
    let user_agent = header(&req, "user-agent");
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let (delay, redirect_to) = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query,
            fastly_key: fastly_key.clone(),
            accept,
            content_type,
            user_agent,
            body: body.clone(),
        });
        (state.delay, state.redirect_to.clone())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(target) = redirect_to {
        return Response::builder()
            .status(StatusCode::TEMPORARY_REDIRECT)
            .header("location", format!("{target}{path}"))
            .body(Full::new(Bytes::new()))
            .unwrap();
    }

    // `/moved/...` permanently lives one level up
    if let Some(rest) = path.strip_prefix("/moved") {
        return Response::builder()
            .status(StatusCode::FOUND)
            .header("location", rest)
            .body(Full::new(Bytes::new()))
            .unwrap();
    }

    let mut state = state.lock().unwrap();
    if let Some((status, body)) = state.forced.clone() {
        return response(status, body);
    }
    if fastly_key.as_deref() != Some(TOKEN) {
        return response(StatusCode::UNAUTHORIZED, r#"{"msg":"Provide an API key"}"#);
    }

    let prefix = format!("/resources/stores/kv/{STORE_ID}/keys/");
    let Some(key) = path.strip_prefix(&prefix) else {
        return response(StatusCode::NOT_FOUND, "no such store");
    };

    match method {
        Method::GET => match state.entries.get(key) {
            Some(value) => response(StatusCode::OK, value.clone()),
            None => response(StatusCode::NOT_FOUND, "not found"),
        },
        Method::PUT => {
            state.entries.insert(key.to_string(), body);
            response(StatusCode::OK, "")
        }
        Method::DELETE => match state.entries.remove(key) {
            Some(_) => response(StatusCode::NO_CONTENT, ""),
            None => response(StatusCode::NOT_FOUND, "not found"),
        },
        _ => response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub operation: Operation,
    pub key: String,
    pub status: Option<u16>,
    pub timeout: bool,
    pub message: String,
}

/// Observer that keeps every report for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    failures: Mutex<Vec<Failure>>,
    ignored_ttls: Mutex<Vec<(String, u64)>>,
}

impl RecordingObserver {
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().unwrap().clone()
    }

    pub fn ignored_ttls(&self) -> Vec<(String, u64)> {
        self.ignored_ttls.lock().unwrap().clone()
    }
}

impl CacheObserver for RecordingObserver {
    fn request_failed(&self, operation: Operation, key: &str, error: &CacheError) {
        self.failures.lock().unwrap().push(Failure {
            operation,
            key: key.to_string(),
            status: error.status().map(|s| s.as_u16()),
            timeout: error.is_timeout(),
            message: error.to_string(),
        });
    }

    fn ttl_ignored(&self, key: &str, ttl: u64) {
        self.ignored_ttls.lock().unwrap().push((key.to_string(), ttl));
    }
}
