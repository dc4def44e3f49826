//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use secretproof::error::{Error, Result};
use secretproof::execution::{
    ExecutionHandle, ExecutionRequest, ExecutionSubmitter, ExecutionTemplate, FeedError,
    PollPolicy, ResultLocation, StatusEvent, StatusFeed, TaskDriver, TaskStatus,
};
use secretproof::fingerprint::{FingerprintRepository, MemoryFingerprintRepository};
use secretproof::provisioning::{ProducerSpec, ProvisioningCoordinator};
use secretproof::results::ResultFetcher;
use secretproof::secrets::{self, SecretType};
use secretproof::store::{MemorySecretStore, SecretStore};
use secretproof::workflow::ProofWorkflow;

pub const CONSUMER: &str = "0xc0dec0dec0dec0dec0dec0dec0dec0dec0dec0de";
pub const OTHER_CONSUMER: &str = "0xbeefbeefbeefbeefbeefbeefbeefbeefbeefbeef";
pub const PRODUCER_APP: &str = "0xproducer";
pub const CONSUMER_APP: &str = "0xconsumer";
pub const LABEL: &str = "1";

/// Millisecond timings so the whole flow runs in well under a second.
pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        settle_delay: Duration::from_millis(1),
        interval_seed: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        backoff_factor: 2.0,
        max_wait: Duration::from_millis(300),
    }
}

pub fn template(program: &str) -> ExecutionTemplate {
    ExecutionTemplate {
        program_identity: program.to_string(),
        category: 0,
        price_ceiling: 0,
        tags: ["tee".to_string()].into_iter().collect::<BTreeSet<_>>(),
    }
}

// ============================================================================
// Marketplace
// ============================================================================

/// Accepts every request and replays a per-program status script.
///
/// Each task walks its script one status per poll and then repeats the last
/// one. Completed tasks point at `{program}/{taskId}`.
pub struct FakeMarketplace {
    next_id: AtomicUsize,
    scripts: Mutex<HashMap<String, Vec<TaskStatus>>>,
    tasks: Mutex<HashMap<String, (String, VecDeque<TaskStatus>)>>,
    submitted: Mutex<Vec<ExecutionRequest>>,
}

impl FakeMarketplace {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            scripts: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, program: &str, statuses: &[TaskStatus]) {
        self.scripts
            .lock()
            .insert(program.to_string(), statuses.to_vec());
    }

    pub fn submitted(&self) -> Vec<ExecutionRequest> {
        self.submitted.lock().clone()
    }

    pub fn submitted_programs(&self) -> Vec<String> {
        self.submitted()
            .into_iter()
            .map(|r| r.program_identity)
            .collect()
    }
}

#[async_trait]
impl ExecutionSubmitter for FakeMarketplace {
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task_id = format!("task-{n}");
        let script = self
            .scripts
            .lock()
            .get(&request.program_identity)
            .cloned()
            .unwrap_or_else(|| vec![TaskStatus::Active, TaskStatus::Completed]);

        self.tasks.lock().insert(
            task_id.clone(),
            (request.program_identity.clone(), script.into()),
        );
        self.submitted.lock().push(request.clone());

        Ok(ExecutionHandle {
            deal_id: format!("deal-{n}"),
            task_id,
        })
    }
}

#[async_trait]
impl StatusFeed for FakeMarketplace {
    async fn next_event(
        &self,
        handle: &ExecutionHandle,
    ) -> std::result::Result<StatusEvent, FeedError> {
        let mut tasks = self.tasks.lock();
        let (program, queue) = tasks.get_mut(&handle.task_id).ok_or(FeedError::NotFound)?;
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        }
        .ok_or(FeedError::NotFound)?;

        Ok(match status {
            TaskStatus::Completed => {
                StatusEvent::completed(format!("{}/{}", program, handle.task_id))
            }
            other => StatusEvent::new(other, "scripted"),
        })
    }
}

// ============================================================================
// Result fetcher
// ============================================================================

/// Plays both confidential apps: each reports the digest of whatever the
/// store holds for `consumer` at fetch time, unless a document is pinned.
pub struct EnclaveFetcher {
    store: Arc<MemorySecretStore>,
    consumer: String,
    producer_doc: Mutex<Option<Value>>,
    consumer_doc: Mutex<Option<Value>>,
    consumer_unreadable: Mutex<bool>,
}

impl EnclaveFetcher {
    pub fn new(store: Arc<MemorySecretStore>, consumer: &str) -> Self {
        Self {
            store,
            consumer: consumer.to_string(),
            producer_doc: Mutex::new(None),
            consumer_doc: Mutex::new(None),
            consumer_unreadable: Mutex::new(false),
        }
    }

    pub fn pin_producer(&self, doc: Value) {
        *self.producer_doc.lock() = Some(doc);
    }

    pub fn pin_consumer(&self, doc: Value) {
        *self.consumer_doc.lock() = Some(doc);
    }

    pub fn break_consumer(&self) {
        *self.consumer_unreadable.lock() = true;
    }

    fn stored_digest(&self) -> Option<String> {
        self.store
            .digest_for(&self.consumer)
            .map(|d| d.as_str().to_string())
    }
}

#[async_trait]
impl ResultFetcher for EnclaveFetcher {
    async fn fetch(&self, location: &ResultLocation) -> Result<Value> {
        let location = location.as_str();
        if location.starts_with(PRODUCER_APP) {
            if let Some(doc) = self.producer_doc.lock().clone() {
                return Ok(doc);
            }
            return Ok(match self.stored_digest() {
                Some(hash) => json!({ "secretInfo": { "hash": hash } }),
                None => json!({}),
            });
        }

        if location.starts_with(CONSUMER_APP) {
            if *self.consumer_unreadable.lock() {
                return Err(Error::ResultMalformed("archive has no 'result.json' member".into()));
            }
            if let Some(doc) = self.consumer_doc.lock().clone() {
                return Ok(doc);
            }
            return Ok(match self.stored_digest() {
                Some(hash) => json!({ "hashes": { "sha256": hash }, "preview": "sk-abcdefgh" }),
                None => json!({}),
            });
        }

        Err(Error::ResultUnavailable(format!("unknown location {location}")))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub repository: Arc<dyn FingerprintRepository>,
    pub store: Arc<MemorySecretStore>,
    pub market: Arc<FakeMarketplace>,
    pub fetcher: Arc<EnclaveFetcher>,
    pub workflow: ProofWorkflow,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(MemoryFingerprintRepository::new()))
    }

    pub fn with_repository(repository: Arc<dyn FingerprintRepository>) -> Self {
        Self::with_parts(repository, Arc::new(MemorySecretStore::new(false)))
    }

    pub fn with_parts(
        repository: Arc<dyn FingerprintRepository>,
        store: Arc<MemorySecretStore>,
    ) -> Self {
        let market = Arc::new(FakeMarketplace::new());
        let fetcher = Arc::new(EnclaveFetcher::new(store.clone(), CONSUMER));
        let driver = TaskDriver::new(market.clone(), market.clone(), fast_policy());

        let coordinator = ProvisioningCoordinator::new(
            repository.clone(),
            store.clone(),
            driver.clone(),
            fetcher.clone(),
            ProducerSpec {
                template: template(PRODUCER_APP),
                label: LABEL.to_string(),
                secret_type: SecretType::ApiKey,
            },
        );
        let workflow = ProofWorkflow::new(
            coordinator,
            driver,
            fetcher.clone(),
            template(CONSUMER_APP),
            "hash".to_string(),
        );

        Self {
            repository,
            store,
            market,
            fetcher,
            workflow,
        }
    }
}

/// Put a fresh secret into `store` for `consumer`, as an earlier run would
/// have.
pub async fn seed_store(store: &MemorySecretStore, consumer: &str) {
    let secret = secrets::generate(SecretType::Hex);
    store
        .push(consumer, secret.value())
        .await
        .expect("seed push");
}

/// A result archive holding `doc` as `iexec_out/result.json`, next to the
/// app's stdout.
pub fn result_archive(doc: &Value) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file("iexec_out/stdout.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"done\n").unwrap();
        writer
            .start_file("iexec_out/result.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(doc.to_string().as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}
