//! Shared fakes and utilities for integration testing.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use proxy_config_manager::config::GeneratorOptions;
use proxy_config_manager::manager::{Collaborators, ConfigVersion, VersionTracker};
use proxy_config_manager::observability::TracingLogSink;
use proxy_config_manager::service::types::{Api, DeploymentAttributes, Http, HttpRule};
use proxy_config_manager::service::{
    ConfigFetcher, FetchError, FetchResult, MetadataSource, ResolvedServiceInfo,
    ServiceConfigDocument,
};
use proxy_config_manager::snapshot::{
    BuildError, ClientIdentityKey, CommitError, DefaultSnapshotBuilder, InMemorySnapshotStore,
    NodeIdHash, NodeIdentity, ResourceSnapshot, SnapshotBuilder, SnapshotStore,
};

pub const SERVICE: &str = "bookstore.example";

/// A minimal valid document for `SERVICE`.
pub fn document(config_id: &str) -> ServiceConfigDocument {
    ServiceConfigDocument {
        name: SERVICE.to_string(),
        id: config_id.to_string(),
        apis: vec![Api {
            name: "endpoints.examples.bookstore.Bookstore".to_string(),
            ..Default::default()
        }],
        http: Some(Http {
            rules: vec![HttpRule {
                selector: "endpoints.examples.bookstore.Bookstore.ListShelves".to_string(),
                get: Some("/v1/shelves".to_string()),
                ..Default::default()
            }],
        }),
        ..Default::default()
    }
}

/// Version tracker answering from a script; answers "unchanged" once the script runs out.
#[derive(Default)]
pub struct ScriptedTracker {
    script: Mutex<VecDeque<Result<ConfigVersion, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedTracker {
    pub fn new(script: Vec<Result<ConfigVersion, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, answer: Result<ConfigVersion, String>) {
        self.script.lock().unwrap().push_back(answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionTracker for ScriptedTracker {
    async fn resolve(
        &self,
        _service: &str,
        previous_rollout_id: &str,
        previous_config_id: &str,
    ) -> FetchResult<ConfigVersion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(version)) => Ok(version),
            Some(Err(message)) => Err(FetchError::Missing(message)),
            None => Ok(ConfigVersion::new(previous_rollout_id, previous_config_id)),
        }
    }
}

/// Config fetcher serving `document(config_id)` for every id not marked as failing.
#[derive(Default)]
pub struct FakeFetcher {
    failing: Mutex<HashSet<String>>,
    overrides: Mutex<HashMap<String, ServiceConfigDocument>>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn fail_on(&self, config_id: &str) {
        self.failing.lock().unwrap().insert(config_id.to_string());
    }

    pub fn recover(&self, config_id: &str) {
        self.failing.lock().unwrap().remove(config_id);
    }

    pub fn serve(&self, config_id: &str, doc: ServiceConfigDocument) {
        self.overrides.lock().unwrap().insert(config_id.to_string(), doc);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigFetcher for FakeFetcher {
    async fn fetch(&self, _service: &str, config_id: &str) -> FetchResult<ServiceConfigDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(config_id) {
            return Err(FetchError::Status {
                url: format!("fake://configs/{}", config_id),
                status: 503,
            });
        }
        if let Some(doc) = self.overrides.lock().unwrap().get(config_id) {
            return Ok(doc.clone());
        }
        Ok(document(config_id))
    }
}

/// Default builder that counts calls and can be told to fail for given config ids.
#[derive(Default)]
pub struct CountingBuilder {
    inner: DefaultSnapshotBuilder,
    failing: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl CountingBuilder {
    pub fn fail_on(&self, config_id: &str) {
        self.failing.lock().unwrap().insert(config_id.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotBuilder for CountingBuilder {
    fn build(&self, info: &ResolvedServiceInfo) -> Result<ResourceSnapshot, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&info.config_id) {
            return Err(BuildError::InvalidOption {
                field: "test",
                reason: format!("build of {} rejected", info.config_id),
            });
        }
        self.inner.build(info)
    }
}

/// In-memory store recording every commit.
pub struct RecordingStore {
    inner: InMemorySnapshotStore,
    reject: Mutex<bool>,
    pub commits: Mutex<Vec<(ClientIdentityKey, String)>>,
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self {
            inner: InMemorySnapshotStore::new(Arc::new(NodeIdHash), Arc::new(TracingLogSink)),
            reject: Mutex::new(false),
            commits: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingStore {
    pub fn reject_commits(&self, reject: bool) {
        *self.reject.lock().unwrap() = reject;
    }

    pub fn commit_versions(&self) -> Vec<String> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl SnapshotStore for RecordingStore {
    fn commit(&self, key: &ClientIdentityKey, snapshot: ResourceSnapshot) -> Result<(), CommitError> {
        if *self.reject.lock().unwrap() {
            return Err(CommitError::Unavailable("rejected by test".to_string()));
        }
        let version = snapshot.version.clone();
        self.inner.commit(key, snapshot)?;
        self.commits.lock().unwrap().push((key.clone(), version));
        Ok(())
    }

    fn snapshot(&self, key: &ClientIdentityKey) -> Option<Arc<ResourceSnapshot>> {
        self.inner.snapshot(key)
    }

    fn key_for(&self, node: &NodeIdentity) -> ClientIdentityKey {
        self.inner.key_for(node)
    }

    fn fetch(&self, node: &NodeIdentity) -> Option<Arc<ResourceSnapshot>> {
        self.inner.fetch(node)
    }
}

/// Metadata source with fixed answers; `None` answers fail.
#[derive(Default)]
pub struct FakeMetadata {
    pub service_name: Option<String>,
    pub config_id: Option<String>,
    pub rollout_strategy: Option<String>,
}

fn answer(value: &Option<String>, key: &str) -> FetchResult<String> {
    value
        .clone()
        .ok_or_else(|| FetchError::Missing(format!("metadata key {} not found", key)))
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn fetch_service_name(&self) -> FetchResult<String> {
        answer(&self.service_name, "endpoints-service-name")
    }

    async fn fetch_config_id(&self) -> FetchResult<String> {
        answer(&self.config_id, "endpoints-service-config-id")
    }

    async fn fetch_rollout_strategy(&self) -> FetchResult<String> {
        answer(&self.rollout_strategy, "endpoints-rollout-strategy")
    }

    async fn fetch_deployment_attributes(&self) -> DeploymentAttributes {
        DeploymentAttributes {
            project_id: Some("test-project".to_string()),
            zone: Some("us-central1-a".to_string()),
            platform: Some("GCE".to_string()),
        }
    }
}

/// Every fake wired together.
pub struct Harness {
    pub tracker: Arc<ScriptedTracker>,
    pub fetcher: Arc<FakeFetcher>,
    pub builder: Arc<CountingBuilder>,
    pub store: Arc<RecordingStore>,
    pub metadata: Option<Arc<FakeMetadata>>,
}

impl Harness {
    pub fn new(script: Vec<Result<ConfigVersion, String>>) -> Self {
        Self {
            tracker: Arc::new(ScriptedTracker::new(script)),
            fetcher: Arc::new(FakeFetcher::default()),
            builder: Arc::new(CountingBuilder::default()),
            store: Arc::new(RecordingStore::default()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: FakeMetadata) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            tracker: self.tracker.clone(),
            builder: self.builder.clone(),
            store: self.store.clone(),
            metadata: self
                .metadata
                .clone()
                .map(|m| m as Arc<dyn MetadataSource>),
        }
    }

    pub fn current_snapshot_version(&self) -> Option<String> {
        let key = ClientIdentityKey(GeneratorOptions::default().node);
        self.store.snapshot(&key).map(|s| s.version.clone())
    }
}

/// Start a mock HTTP server answering each path from `routes`; unknown paths get 404.
///
/// Routes are matched against the request target including the query string.
pub async fn start_json_backend(routes: HashMap<String, (u16, String)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let routes = routes.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let request = String::from_utf8_lossy(&buf[..n]);
                        let target = request
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = routes
                            .get(&target)
                            .cloned()
                            .unwrap_or((404, "{}".to_string()));
                        let status_text = match status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
