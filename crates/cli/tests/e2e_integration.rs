//! End-to-end integration tests for the DSA tutor.
//!
//! These tests exercise the full pipeline from user input to tutor output:
//! topic gate, context window, prompt assembly, the model call and session
//! history, plus the HTTP surface on top of it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use dsatutor_agent::{ChatPipeline, ContextWindow, GateDecision, PromptAssembler, TopicGate};
use dsatutor_config::AppConfig;
use dsatutor_core::error::ProviderError;
use dsatutor_core::history::HistoryStore;
use dsatutor_core::message::{ChatTurn, Role, SessionId};
use dsatutor_core::prompt::{ANSWER_CUE, CONTEXT_HEADER};
use dsatutor_core::provider::{Completion, Provider, ProviderRequest, Usage};
use dsatutor_gateway::{GatewayState, build_router};
use dsatutor_memory::{FileHistory, InMemoryHistory};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted outcomes in sequence and keeps
/// every request it saw.
struct ScriptedProvider {
    outcomes: std::sync::Mutex<Vec<Result<String, ProviderError>>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(mut outcomes: Vec<Result<String, ProviderError>>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: std::sync::Mutex::new(outcomes),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<Completion, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let outcome = self.outcomes.lock().unwrap().pop().unwrap_or_else(|| {
            panic!("ScriptedProvider exhausted");
        });
        outcome.map(|text| Completion {
            text,
            model,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.tutor.seed_welcome = false;
    config
}

fn pipeline_with(
    provider: Arc<ScriptedProvider>,
    history: Arc<dyn HistoryStore>,
) -> ChatPipeline {
    ChatPipeline::from_config_with(&test_config(), provider, history)
}

// ── Scenario 1: first question, empty session ────────────────────────────

#[tokio::test]
async fn e2e_first_question_goes_to_model_without_context() {
    let provider = Arc::new(ScriptedProvider::texts(&["Binary search halves the range."]));
    let history = Arc::new(InMemoryHistory::new());
    let pipeline = pipeline_with(provider.clone(), history.clone());
    let session = SessionId::from("scenario-1");

    let reply = pipeline.ask(&session, "What is binary search?").await.unwrap();

    assert!(!reply.redirected);
    assert_eq!(reply.text, "Binary search halves the range.");
    assert_eq!(provider.calls(), 1);

    let payload = provider.request(0).payload;
    let [instruction, message] = payload.parts();
    assert!(instruction.starts_with(&test_config().tutor.persona));
    assert!(!instruction.contains(CONTEXT_HEADER));
    assert!(!instruction.contains("User:"));
    assert!(instruction.ends_with(ANSWER_CUE));
    assert_eq!(message, "What is binary search?");
}

// ── Scenario 2: off-topic question ───────────────────────────────────────

#[tokio::test]
async fn e2e_off_topic_question_is_redirected_verbatim() {
    let provider = Arc::new(ScriptedProvider::texts(&[]));
    let history = Arc::new(InMemoryHistory::new());
    let pipeline = pipeline_with(provider.clone(), history.clone());
    let session = SessionId::from("scenario-2");

    let reply = pipeline.ask(&session, "Tell me about football").await.unwrap();

    assert!(reply.redirected);
    assert_eq!(reply.text, dsatutor_config::DEFAULT_REDIRECT);
    assert_eq!(provider.calls(), 0);

    let turns = history.recent(&session, 10).await.unwrap();
    assert_eq!(turns.last().unwrap().role, Role::Assistant);
    assert_eq!(turns.last().unwrap().content, dsatutor_config::DEFAULT_REDIRECT);
}

// ── Scenario 3: long session, bounded window ─────────────────────────────

#[tokio::test]
async fn e2e_long_session_sends_most_recent_ten_turns() {
    let provider = Arc::new(ScriptedProvider::texts(&["Merge sort is O(n log n)."]));
    let history = Arc::new(InMemoryHistory::new());
    let session = SessionId::from("scenario-3");

    for i in 0..6 {
        history
            .append(&session, ChatTurn::user(format!("question {i}")))
            .await
            .unwrap();
        history
            .append(&session, ChatTurn::assistant(format!("answer {i}")))
            .await
            .unwrap();
    }

    let pipeline = pipeline_with(provider.clone(), history.clone());
    pipeline.ask(&session, "What about merge sort?").await.unwrap();

    let window = provider.request(0).payload.context_window;
    assert_eq!(window.len(), 10);
    assert_eq!(window[0].content, "question 1");
    assert_eq!(window[9].content, "answer 5");
    assert!(window.windows(2).all(|w| w[0].sequence < w[1].sequence));

    let instruction = provider.request(0).payload.instruction();
    assert!(!instruction.contains("question 0"));
    assert!(instruction.contains("User: question 1\n"));
}

// ── Scenario 4: model failure ────────────────────────────────────────────

#[tokio::test]
async fn e2e_model_failure_is_generic_and_not_recorded() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(ProviderError::Network("connection reset".into())),
        Ok("Heaps are complete binary trees.".into()),
    ]));
    let history = Arc::new(InMemoryHistory::new());
    let pipeline = pipeline_with(provider.clone(), history.clone());
    let session = SessionId::from("scenario-4");

    let err = pipeline.ask(&session, "Explain heaps").await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to get response from AI");
    assert_eq!(err.kind(), "gateway");
    assert!(history.recent(&session, 10).await.unwrap().is_empty());

    // Resubmitting does not duplicate the failed exchange.
    pipeline.ask(&session, "Explain heaps").await.unwrap();
    let turns = history.recent(&session, 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert!(provider.request(1).payload.context_window.is_empty());
}

// ── Properties ───────────────────────────────────────────────────────────

#[tokio::test]
async fn prop_recent_never_exceeds_bound() {
    let history = InMemoryHistory::new();
    let session = SessionId::from("prop");
    for i in 0..25 {
        history
            .append(&session, ChatTurn::user(format!("q{i}")))
            .await
            .unwrap();

        for n in [0, 1, 3, 10, 30] {
            let turns = history.recent(&session, n).await.unwrap();
            assert!(turns.len() <= n);
            assert!(turns.windows(2).all(|w| w[0].sequence <= w[1].sequence));
        }
    }
}

#[test]
fn prop_gate_matches_keywords_case_insensitively() {
    let config = AppConfig::default();
    let gate = TopicGate::from_config(&config.topic_gate);

    for keyword in &config.topic_gate.keywords {
        for message in [
            format!("tell me about {keyword}"),
            format!("{} trivia", keyword.to_uppercase()),
            format!("x{keyword}x"),
        ] {
            assert!(gate.classify(&message).is_redirect(), "{message}");
        }
    }

    for message in ["Explain Dijkstra", "What is a trie?", "Big O of heapify"] {
        assert_eq!(gate.classify(message), GateDecision::Allowed, "{message}");
    }
}

#[tokio::test]
async fn prop_clear_leaves_empty_or_welcome() {
    let session = SessionId::from("prop-clear");

    let plain = InMemoryHistory::new();
    plain.append(&session, ChatTurn::user("hello")).await.unwrap();
    plain.clear(&session).await.unwrap();
    assert!(plain.recent(&session, 10).await.unwrap().is_empty());

    let seeded = InMemoryHistory::new().with_welcome(Some("Welcome!".into()));
    seeded.append(&session, ChatTurn::user("hello")).await.unwrap();
    seeded.clear(&session).await.unwrap();
    let turns = seeded.recent(&session, 10).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, "Welcome!");
}

#[test]
fn prop_window_and_assembly_are_deterministic() {
    let assembler = PromptAssembler::from_config(&test_config().tutor);
    let history: Vec<ChatTurn> = (0..4).map(|i| ChatTurn::user(format!("t{i}"))).collect();

    let a = assembler.assemble(ContextWindow::build(&history, 3), "Explain BFS");
    let b = assembler.assemble(ContextWindow::build(&history, 3), "Explain BFS");
    assert_eq!(a.parts(), b.parts());
    assert_eq!(a.context_window.len(), 3);
}

// ── Persistence ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_file_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("persisted");

    {
        let provider = Arc::new(ScriptedProvider::texts(&["Nice to meet you, Rohit."]));
        let history = Arc::new(FileHistory::new(dir.path()));
        let pipeline = pipeline_with(provider, history);
        pipeline.ask(&session, "My name is Rohit").await.unwrap();
    }

    let provider = Arc::new(ScriptedProvider::texts(&["Your name is Rohit."]));
    let history = Arc::new(FileHistory::new(dir.path()));
    let pipeline = pipeline_with(provider.clone(), history);
    pipeline.ask(&session, "What is my name?").await.unwrap();

    let instruction = provider.request(0).payload.instruction();
    assert!(instruction.contains("User: My name is Rohit\n"));
    assert!(instruction.contains("Assistant: Nice to meet you, Rohit.\n"));
}

// ── HTTP ─────────────────────────────────────────────────────────────────

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn e2e_http_chat_remembers_within_session() {
    let provider = Arc::new(ScriptedProvider::texts(&["Hi Rohit!", "You are Rohit."]));
    let pipeline = pipeline_with(provider.clone(), Arc::new(InMemoryHistory::new()));
    let app = build_router(
        Arc::new(GatewayState {
            pipeline: Arc::new(pipeline),
        }),
        &[],
    );

    let (status, first) = post_json(
        &app,
        "/api/chat",
        serde_json::json!({"message": "My name is Rohit", "sessionId": "web-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["response"], "Hi Rohit!");

    let (_, second) = post_json(
        &app,
        "/api/chat",
        serde_json::json!({"message": "Who am I?", "sessionId": "web-1"}),
    )
    .await;
    assert_eq!(second["response"], "You are Rohit.");
    assert_eq!(provider.request(1).payload.context_window.len(), 2);

    // A different session starts from nothing.
    let (status, _) = post_json(
        &app,
        "/api/chat",
        serde_json::json!({"message": "Tell me about politics", "sessionId": "web-2"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn e2e_http_ask_failure_maps_to_500() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
        "request exceeded 30s".into(),
    ))]));
    let pipeline = pipeline_with(provider, Arc::new(InMemoryHistory::new()));
    let app = build_router(
        Arc::new(GatewayState {
            pipeline: Arc::new(pipeline),
        }),
        &[],
    );

    let (status, body) = post_json(
        &app,
        "/api/ask",
        serde_json::json!({"question": "Explain AVL rotations", "conversationHistory": []}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get response from AI");
    assert_eq!(body["kind"], "gateway");
}
