use super::*;
use crate::pipeline::ingest::IngestPipeline;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct EchoEmbeddings;

impl Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body is JSON");
        let count = body["input"].as_array().map_or(0, |inputs| inputs.len());

        let data: Vec<serde_json::Value> = (0..count)
            .map(|i| json!({"index": i, "embedding": [0.1, 0.2, 0.3, 0.4]}))
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

struct TestService {
    ingest: IngestPipeline,
    chat: ChatPipeline,
    _temp_dir: TempDir,
}

async fn test_service(server: &MockServer) -> TestService {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.openai.embedding_dimension = 4;

    let store = Arc::new(
        VectorStore::connect(&config)
            .await
            .expect("should connect store"),
    );
    let api_base: url::Url = server.uri().parse().expect("valid URL");
    let embeddings = Arc::new(
        EmbeddingClient::new(&config, "test-key".to_string())
            .expect("should create client")
            .with_api_base(api_base.clone()),
    );
    let chat_client = Arc::new(
        ChatClient::new(&config, "test-key".to_string())
            .expect("should create client")
            .with_api_base(api_base),
    );

    TestService {
        ingest: IngestPipeline::new(store.clone(), embeddings.clone(), &config),
        chat: ChatPipeline::new(store, embeddings, chat_client, &config),
        _temp_dir: temp_dir,
    }
}

async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .mount(server)
        .await;
}

#[tokio::test]
async fn unknown_bot_never_reaches_the_model() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = test_service(&server).await;
    let result = service.chat.answer("no-such-bot", "Hello?", &[]).await;

    match result {
        Err(DocativeError::UnknownBot(bot_id)) => assert_eq!(bot_id, "no-such-bot"),
        other => panic!("expected UnknownBot, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn ingest_then_chat_end_to_end() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    // The completion mock only matches when the prompt carries the ingested
    // sentence, proving the retrieval context included it.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(
            "Alice is a backend engineer with 5 years of experience",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": "Alice is a backend engineer working on distributed systems."
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = test_service(&server).await;

    let bot_id = service
        .ingest
        .ingest(
            "Alice is a backend engineer with 5 years of experience in distributed systems.",
            "a@x.com",
            "Alice",
            false,
        )
        .await
        .expect("ingest should succeed");

    let answer = service
        .chat
        .answer(&bot_id, "What does Alice do?", &[])
        .await
        .expect("chat should succeed");

    assert!(!answer.is_empty());
    assert!(answer.contains("backend engineer"));
}

#[tokio::test]
async fn history_is_windowed_into_the_prompt() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    // Turn 5 is the first inside the 10-turn window; turn 4 must be absent.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("user: message 5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Sure."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = test_service(&server).await;
    let bot_id = service
        .ingest
        .ingest("Some content.", "a@x.com", "Alice", false)
        .await
        .expect("ingest should succeed");

    let history: Vec<ChatTurn> = (0..15)
        .map(|i| ChatTurn {
            sender: "user".to_string(),
            text: format!("message {}", i),
        })
        .collect();

    service
        .chat
        .answer(&bot_id, "Follow-up?", &history)
        .await
        .expect("chat should succeed");

    let requests = server.received_requests().await.expect("recorded requests");
    let completion = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .expect("completion request was made");
    let prompt_body = String::from_utf8_lossy(&completion.body).to_string();

    assert!(!prompt_body.contains("message 4"));
    assert!(prompt_body.contains("message 14"));
}

#[tokio::test]
async fn blank_model_output_is_an_empty_answer_failure() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  \n "}}]
        })))
        .mount(&server)
        .await;

    let service = test_service(&server).await;
    let bot_id = service
        .ingest
        .ingest("Some content.", "a@x.com", "Alice", false)
        .await
        .expect("ingest should succeed");

    let result = service.chat.answer(&bot_id, "Hello?", &[]).await;
    assert!(matches!(result, Err(DocativeError::EmptyAnswer)));
}

#[tokio::test]
async fn model_failure_propagates() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let service = test_service(&server).await;
    let bot_id = service
        .ingest
        .ingest("Some content.", "a@x.com", "Alice", false)
        .await
        .expect("ingest should succeed");

    let result = service.chat.answer(&bot_id, "Hello?", &[]).await;
    assert!(matches!(result, Err(DocativeError::Model(_))));
}
