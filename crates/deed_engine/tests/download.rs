use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deed_core::{AssetId, DownloadOutcome, LinkCollection, LinkSet};
use deed_engine::{
    DownloadEngine, DownloadSettings, EngineEvent, FailureKind, FetchError, FetchSettings,
    Fetcher, ProgressSink, ReqwestFetcher,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn instant_settings() -> DownloadSettings {
    DownloadSettings {
        max_attempts: 3,
        retry_delay: Duration::ZERO,
        post_download_delay: Duration::ZERO,
    }
}

fn engine() -> DownloadEngine<ReqwestFetcher> {
    DownloadEngine::new(ReqwestFetcher::new(FetchSettings::default()), instant_settings())
}

fn collection(asset: &str, urls: &[String]) -> LinkCollection {
    vec![(AssetId::parse(asset).unwrap(), urls.iter().collect::<LinkSet>())]
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn succeeds_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/escritura.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/escritura.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 deed".to_vec()))
        .with_priority(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let sink = TestSink::default();
    let links = collection("FLKY11", &[format!("{}/flaky/escritura.pdf", server.uri())]);

    let report = engine().run(temp.path(), &links, &sink).await;

    assert_eq!(request_count(&server).await, 3);
    assert_eq!(
        report.records[0].outcome,
        DownloadOutcome::Success { bytes_written: 13 }
    );
    assert_eq!(report.tally.succeeded, 1);
    assert!(report.tally.is_clean());

    let attempts: Vec<u32> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::DownloadAttempt { attempt, .. } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test]
async fn fails_after_exactly_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down/escritura.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let links = collection("DOWN11", &[format!("{}/down/escritura.pdf", server.uri())]);

    let report = engine().run(temp.path(), &links, &TestSink::default()).await;

    assert_eq!(request_count(&server).await, 3);
    assert!(matches!(report.records[0].outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(report.tally.failed, 1);
    assert!(!report.tally.is_clean());
    assert!(!temp.path().join("DOWN").join("escritura.pdf").exists());
}

#[tokio::test]
async fn rerun_skips_everything_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/Escritura%20ABC%201.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first deed".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/deed-2.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second deed".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let links = collection(
        "abcd12",
        &[
            format!("{}/docs/Escritura%20ABC%201.pdf", server.uri()),
            format!("{}/docs/deed-2.pdf", server.uri()),
        ],
    );
    let engine = engine();

    let first = engine.run(temp.path(), &links, &TestSink::default()).await;
    assert_eq!(first.tally.succeeded, 2);
    assert_eq!(request_count(&server).await, 2);

    let decoded = temp.path().join("ABCD").join("Escritura ABC 1.pdf");
    assert_eq!(fs::read(&decoded).unwrap(), b"first deed");

    let second = engine.run(temp.path(), &links, &TestSink::default()).await;
    assert_eq!(request_count(&server).await, 2);
    assert_eq!(second.tally.skipped, 2);
    assert_eq!(second.tally.total(), 2);
    assert_eq!(fs::read(&decoded).unwrap(), b"first deed");
    assert_eq!(
        fs::read(temp.path().join("ABCD").join("deed-2.pdf")).unwrap(),
        b"second deed"
    );
}

#[tokio::test]
async fn empty_leftover_is_fetched_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/escritura.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"deed".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("EMPT")).unwrap();
    fs::write(temp.path().join("EMPT").join("escritura.pdf"), b"").unwrap();
    let links = collection("EMPT11", &[format!("{}/escritura.pdf", server.uri())]);

    let report = engine().run(temp.path(), &links, &TestSink::default()).await;

    assert_eq!(report.records[0].outcome, DownloadOutcome::Success { bytes_written: 4 });
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn duplicate_urls_download_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dup/escritura.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"deed".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let url = format!("{}/dup/escritura.pdf", server.uri());
    let links = collection("DUPL11", &[url.clone(), url]);

    let report = engine().run(temp.path(), &links, &TestSink::default()).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(request_count(&server).await, 1);
}

/// Counts calls and always fails with the configured kind.
struct FailingFetcher {
    kind: FailureKind,
    calls: Arc<Mutex<u32>>,
}

impl FailingFetcher {
    fn new(kind: FailureKind) -> (Self, Arc<Mutex<u32>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            Self {
                kind,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for FailingFetcher {
    async fn fetch_to_file(&self, _url: &str, _destination: &Path) -> Result<u64, FetchError> {
        *self.calls.lock().unwrap() += 1;
        Err(FetchError {
            kind: self.kind.clone(),
            message: "disk full".to_string(),
        })
    }
}

#[tokio::test]
async fn unexpected_failure_is_not_retried() {
    let (fetcher, calls) = FailingFetcher::new(FailureKind::Io);
    let engine = DownloadEngine::new(fetcher, instant_settings());
    let temp = TempDir::new().unwrap();
    let links = collection("IOER11", &["https://b.s3.amazonaws.com/escritura.pdf".to_string()]);

    let report = engine.run(temp.path(), &links, &TestSink::default()).await;

    assert!(matches!(report.records[0].outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(report.tally.failed, 1);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn transport_failure_uses_every_attempt() {
    let (fetcher, calls) = FailingFetcher::new(FailureKind::Timeout);
    let engine = DownloadEngine::new(fetcher, instant_settings());
    let temp = TempDir::new().unwrap();
    let asset = AssetId::parse("TOUT11").unwrap();

    let record = engine
        .download_one(
            temp.path(),
            &asset,
            "https://b.s3.amazonaws.com/escritura.pdf",
            &TestSink::default(),
        )
        .await;

    match record.outcome {
        DownloadOutcome::Failed { reason } => assert!(reason.starts_with("gave up after 3 attempts")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn issuer_folder_blocked_by_file_fails_its_urls() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("BLOK"), b"not a folder").unwrap();
    let (fetcher, calls) = FailingFetcher::new(FailureKind::Network);
    let engine = DownloadEngine::new(fetcher, instant_settings());
    let links = collection("BLOK11", &["https://b.s3.amazonaws.com/escritura.pdf".to_string()]);

    let report = engine.run(temp.path(), &links, &TestSink::default()).await;

    assert_eq!(report.tally.failed, 1);
    assert_eq!(report.records[0].destination, None);
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn issuer_code_never_escapes_the_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/escritura.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"deed".to_vec()))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let base = root.path().join("escrituras");
    fs::create_dir_all(&base).unwrap();
    let url = format!("{}/escritura.pdf", server.uri());
    let mut links = collection("../x1", &[url.clone()]);
    links.extend(collection("..", &[url]));

    let report = engine().run(&base, &links, &TestSink::default()).await;

    assert_eq!(
        report.records[0].destination,
        Some(base.join(".._X").join("escritura.pdf"))
    );
    assert_eq!(report.records[0].outcome, DownloadOutcome::Success { bytes_written: 4 });
    assert_eq!(report.records[1].destination, None);
    assert!(matches!(report.records[1].outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(request_count(&server).await, 1);
    assert!(!root.path().join("X").exists());
    let outside: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(outside, vec![std::ffi::OsString::from("escrituras")]);
}
