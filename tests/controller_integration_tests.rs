//! Integration tests for SelectionController driving real worker jobs
//!
//! These tests verify that the controller correctly:
//! - Renders persisted codes before any parse runs
//! - Merges parse results and re-renders newest first
//! - Never runs two parse jobs for the same key at once
//! - Suppresses status forwarding only for the duration of a job
//! - Gates redemption on the sign-in state

use shiftkeys::logging::LogSink;
use shiftkeys::models::{AuthState, CodeEntry, Collection, Game, Platform, SelectionKey};
use shiftkeys::services::{
    CodeParser, CollectionStore, JobLog, LoginOutcome, MemoryKeyStore, ParserRegistry,
    RedemptionClient, Status,
};
use shiftkeys::{ControllerEvent, ControllerOptions, SelectionController, SelectionPhase};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use tokio::time::{Duration, timeout};

fn bl3_pc() -> SelectionKey {
    SelectionKey::new(Game::Borderlands3, Platform::Pc)
}

fn entry(code: &str) -> CodeEntry {
    CodeEntry::new(code, format!("{code} keys"), "Unknown")
}

/// Parser that blocks until released, then discovers `codes`
struct GatedParser {
    codes: Vec<&'static str>,
    release: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
    sink: LogSink,
    forwarded_while_running: AtomicBool,
    suppressed_while_running: AtomicBool,
}

impl GatedParser {
    fn new(codes: Vec<&'static str>, sink: LogSink) -> (Arc<Self>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let parser = Arc::new(Self {
            codes,
            release: Mutex::new(rx),
            calls: AtomicUsize::new(0),
            sink,
            forwarded_while_running: AtomicBool::new(false),
            suppressed_while_running: AtomicBool::new(false),
        });
        (parser, tx)
    }
}

impl CodeParser for GatedParser {
    fn parse_keys(&self, collection: &mut Collection, log: &JobLog) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.suppressed_while_running
            .store(LogSink::suppressed_on_current_thread(), Ordering::SeqCst);
        self.forwarded_while_running
            .store(self.sink.append("parser chatter"), Ordering::SeqCst);
        log.info("waiting for release");

        let _ = self.release.lock().unwrap().recv();
        for code in &self.codes {
            collection.insert(entry(code));
        }
        true
    }
}

/// Client that signs in as `alice` and counts redeem calls
#[derive(Default)]
struct CountingClient {
    redeem_calls: AtomicUsize,
}

impl RedemptionClient for CountingClient {
    fn login(&self) -> LoginOutcome {
        LoginOutcome::signed_in("alice")
    }

    fn redeem(&self, code: &str) -> Status {
        self.redeem_calls.fetch_add(1, Ordering::SeqCst);
        if code == "A" {
            Status::AlreadyRedeemed
        } else {
            Status::Invalid
        }
    }
}

struct Harness {
    controller: SelectionController,
    backend: Arc<MemoryKeyStore>,
    sink: LogSink,
}

fn harness(parser: Option<Arc<dyn CodeParser>>, client: Arc<dyn RedemptionClient>, sink: LogSink) -> Harness {
    let backend = Arc::new(MemoryKeyStore::new().with_entries(bl3_pc(), vec![entry("A"), entry("B")]));
    let mut registry = ParserRegistry::new();
    if let Some(parser) = parser {
        registry.register(Game::Borderlands3, Platform::Pc, parser);
    }

    let controller = SelectionController::new(
        CollectionStore::new(backend.clone()),
        registry,
        client,
        sink.clone(),
        tokio::runtime::Handle::current(),
        ControllerOptions {
            max_workers: 2,
            status_timeout: Duration::from_secs(3),
        },
    );

    Harness {
        controller,
        backend,
        sink,
    }
}

async fn next(controller: &mut SelectionController) -> Vec<ControllerEvent> {
    timeout(Duration::from_secs(5), controller.process_next())
        .await
        .expect("Timeout waiting for worker completion")
        .expect("No job outstanding")
}

fn codes(controller: &SelectionController) -> Vec<String> {
    controller.rows().iter().map(|row| row.code.clone()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_persisted_rows_render_before_parse() {
    let sink = LogSink::new();
    let (parser, release) = GatedParser::new(vec!["C"], sink.clone());
    let mut h = harness(Some(parser.clone()), Arc::new(CountingClient::default()), sink);

    h.controller.select(bl3_pc());

    // Parser is still blocked; the persisted codes are already on screen
    assert_eq!(codes(&h.controller), vec!["B", "A"]);
    assert_eq!(h.controller.phase(), SelectionPhase::AwaitingParse(bl3_pc()));

    release.send(()).unwrap();
    next(&mut h.controller).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parse_result_merged_and_rendered() {
    let sink = LogSink::new();
    let (parser, release) = GatedParser::new(vec!["C", "A"], sink.clone());
    let mut h = harness(Some(parser), Arc::new(CountingClient::default()), sink);

    h.controller.select(bl3_pc());
    release.send(()).unwrap();
    let events = next(&mut h.controller).await;

    assert_eq!(codes(&h.controller), vec!["C", "B", "A"]);
    assert_eq!(h.backend.persisted(bl3_pc()).len(), 3);
    assert_eq!(h.controller.phase(), SelectionPhase::Idle(bl3_pc()));
    assert!(events.iter().any(|e| matches!(
        e,
        ControllerEvent::StatusMessage { text, timeout } if text == "Parsing complete" && *timeout == Duration::from_secs(3)
    )));
}

#[tokio::test]
async fn test_none_selection_issues_no_parse() {
    let sink = LogSink::new();
    let (parser, _release) = GatedParser::new(vec!["C"], sink.clone());
    let mut h = harness(Some(parser.clone()), Arc::new(CountingClient::default()), sink);

    let key = SelectionKey::new(Game::None, Platform::Pc);
    let events = h.controller.select(key);

    assert!(h.controller.rows().is_empty());
    assert_eq!(
        events,
        vec![
            ControllerEvent::SelectionChanged { key },
            ControllerEvent::TableRendered { key, rows: 0 },
        ]
    );
    assert_eq!(h.controller.outstanding_jobs(), 0);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_back_to_back_submits_run_one_job() {
    let sink = LogSink::new();
    let (parser, release) = GatedParser::new(vec!["C"], sink.clone());
    let mut h = harness(Some(parser.clone()), Arc::new(CountingClient::default()), sink);

    let first = h.controller.select(bl3_pc());
    let second = h.controller.select(bl3_pc());

    assert!(first.contains(&ControllerEvent::ParseStarted { key: bl3_pc() }));
    assert!(second.contains(&ControllerEvent::ParseRejected { key: bl3_pc() }));

    release.send(()).unwrap();
    next(&mut h.controller).await;

    assert!(h.controller.process_next().await.is_none());
    assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    assert_eq!(codes(&h.controller), vec!["C", "B", "A"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_forwarding_suppressed_only_during_job() {
    let sink = LogSink::new();
    let (parser, release) = GatedParser::new(vec!["C"], sink.clone());
    let mut h = harness(Some(parser.clone()), Arc::new(CountingClient::default()), sink);

    h.controller.select(bl3_pc());
    release.send(()).unwrap();
    next(&mut h.controller).await;

    assert!(parser.suppressed_while_running.load(Ordering::SeqCst));
    assert!(!parser.forwarded_while_running.load(Ordering::SeqCst));
    assert_eq!(h.sink.open_scopes(), 0);
    assert!(!h.sink.lines().iter().any(|line| line.contains("parser chatter")));

    // The controlling thread still forwards after the job
    assert!(h.sink.append("after the job"));
    assert!(h.sink.lines().contains(&"Parsing complete".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_navigating_away_commits_to_persisted_store() {
    let sink = LogSink::new();
    let (parser, release) = GatedParser::new(vec!["C"], sink.clone());
    let mut h = harness(Some(parser), Arc::new(CountingClient::default()), sink);
    let elsewhere = SelectionKey::new(Game::Borderlands2, Platform::Xbox);

    h.controller.select(bl3_pc());
    h.controller.select(elsewhere);
    release.send(()).unwrap();
    let events = next(&mut h.controller).await;

    assert!(h.controller.rows().is_empty());
    assert_eq!(h.controller.selection(), elsewhere);
    assert!(events.contains(&ControllerEvent::ParseFinished {
        key: bl3_pc(),
        success: true,
        added: 1,
        stale: true,
    }));
    assert_eq!(h.backend.persisted(bl3_pc()).len(), 3);
}

#[tokio::test]
async fn test_redeem_while_signing_in_never_reaches_client() {
    let client = Arc::new(CountingClient::default());
    let mut h = harness(None, client.clone(), LogSink::new());

    assert!(h.controller.login());
    assert_eq!(h.controller.auth_state(), &AuthState::SigningIn);

    assert!(!h.controller.redeem("A"));
    next(&mut h.controller).await;

    assert_eq!(client.redeem_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_login_then_redeem_produces_status() {
    let client = Arc::new(CountingClient::default());
    let mut h = harness(None, client.clone(), LogSink::new());
    let mut events_rx = h.controller.subscribe();

    h.controller.select(bl3_pc());
    assert!(h.controller.login());
    let events = next(&mut h.controller).await;

    assert_eq!(
        h.controller.auth_state(),
        &AuthState::SignedIn("alice".to_string())
    );
    assert!(events.contains(&ControllerEvent::AuthChanged {
        state: AuthState::SignedIn("alice".to_string())
    }));

    assert!(h.controller.redeem("A"));
    let events = next(&mut h.controller).await;

    let status = events
        .iter()
        .find_map(|e| match e {
            ControllerEvent::Redeemed { status, .. } => Some(*status),
            _ => None,
        })
        .expect("Redeemed event");
    assert!(Status::ALL.contains(&status));
    assert_eq!(client.redeem_calls.load(Ordering::SeqCst), 1);

    // AlreadyRedeemed marks the row
    assert!(h.controller.rows().iter().any(|row| row.code == "A" && row.redeemed_mark));

    let first = timeout(Duration::from_millis(100), events_rx.recv())
        .await
        .expect("Timeout")
        .expect("Channel closed");
    assert_eq!(first, ControllerEvent::SelectionChanged { key: bl3_pc() });
}

#[tokio::test]
async fn test_redeem_result_applies_to_dispatching_selection() {
    let xbox = SelectionKey::new(Game::Borderlands3, Platform::Xbox);
    let backend = Arc::new(
        MemoryKeyStore::new()
            .with_entries(bl3_pc(), vec![entry("A")])
            .with_entries(xbox, vec![entry("A")]),
    );
    let mut controller = SelectionController::new(
        CollectionStore::new(backend.clone()),
        ParserRegistry::new(),
        Arc::new(CountingClient::default()),
        LogSink::new(),
        tokio::runtime::Handle::current(),
        ControllerOptions::default(),
    );

    controller.select(bl3_pc());
    assert!(controller.login());
    next(&mut controller).await;

    assert!(controller.redeem("A"));
    controller.select(xbox);
    let events = next(&mut controller).await;

    assert!(events.contains(&ControllerEvent::Redeemed {
        key: bl3_pc(),
        code: "A".to_string(),
        status: Status::AlreadyRedeemed,
    }));
    assert!(!events.iter().any(|e| matches!(e, ControllerEvent::TableRendered { .. })));

    // Same code on the other platform stays unredeemed, on disk and on screen
    assert!(backend.persisted(bl3_pc())[0].redeemed());
    assert!(!backend.persisted(xbox)[0].redeemed());
    assert!(!controller.rows()[0].redeemed_mark);
}

#[tokio::test]
async fn test_sign_out_during_login_is_refused() {
    let client = Arc::new(CountingClient::default());
    let mut h = harness(None, client.clone(), LogSink::new());

    assert!(h.controller.login());
    assert!(h.controller.sign_out().is_empty());
    assert_eq!(h.controller.auth_state(), &AuthState::SigningIn);

    // A second login cannot start, so the one result lands on the first
    assert!(!h.controller.login());
    next(&mut h.controller).await;
    assert!(h.controller.process_next().await.is_none());
    assert_eq!(
        h.controller.auth_state(),
        &AuthState::SignedIn("alice".to_string())
    );

    assert_eq!(
        h.controller.sign_out(),
        vec![ControllerEvent::AuthChanged {
            state: AuthState::SignedOut
        }]
    );
    assert!(!h.controller.redeem("A"));
    assert_eq!(client.redeem_calls.load(Ordering::SeqCst), 0);
}
