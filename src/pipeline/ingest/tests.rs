use super::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const DIMENSION: usize = 4;

/// Responds with one deterministic vector per requested input, like the
/// real provider does for a batch.
struct EchoEmbeddings;

impl Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body is JSON");
        let count = body["input"].as_array().map_or(0, |inputs| inputs.len());

        let data: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                json!({
                    "index": i,
                    "embedding": [0.1 * (i + 1) as f32, 0.2, 0.3, 0.4],
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

async fn mock_embeddings_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .mount(&server)
        .await;
    server
}

async fn test_pipeline(server: &MockServer) -> (IngestPipeline, Arc<VectorStore>, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.openai.embedding_dimension = DIMENSION as u32;
    config.chunking.chunk_size = 100;
    config.chunking.chunk_overlap = 10;

    let store = Arc::new(
        VectorStore::connect(&config)
            .await
            .expect("should connect store"),
    );
    let embeddings = Arc::new(
        EmbeddingClient::new(&config, "test-key".to_string())
            .expect("should create client")
            .with_api_base(server.uri().parse().expect("valid URL")),
    );

    (
        IngestPipeline::new(store.clone(), embeddings, &config),
        store,
        temp_dir,
    )
}

#[tokio::test]
async fn ingest_creates_a_discoverable_bot() {
    let server = mock_embeddings_server().await;
    let (pipeline, store, _temp_dir) = test_pipeline(&server).await;

    let bot_id = pipeline
        .ingest("Alice is a backend engineer.", "a@x.com", "Alice", false)
        .await
        .expect("ingest should succeed");

    assert_eq!(
        pipeline
            .find_bot_for_owner("a@x.com")
            .await
            .expect("lookup"),
        Some(bot_id.clone())
    );

    let chunks = store
        .find_by_filter(&ChunkFilter::BotId(bot_id), 10)
        .await
        .expect("query");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].owner_email, "a@x.com");
    assert_eq!(chunks[0].display_name, "Alice");
    assert_eq!(chunks[0].content, "Alice is a backend engineer.");
}

#[tokio::test]
async fn long_text_is_stored_as_ordered_chunks() {
    let server = mock_embeddings_server().await;
    let (pipeline, store, _temp_dir) = test_pipeline(&server).await;

    let text = "Alice builds distributed systems. ".repeat(20);
    let bot_id = pipeline
        .ingest(&text, "a@x.com", "Alice", false)
        .await
        .expect("ingest should succeed");

    let chunks = store
        .find_by_filter(&ChunkFilter::BotId(bot_id), 100)
        .await
        .expect("query");
    assert!(chunks.len() > 1);

    let mut indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
    indices.sort_unstable();
    let expected: Vec<u32> = (0..chunks.len() as u32).collect();
    assert_eq!(indices, expected);
}

#[tokio::test]
async fn blank_content_is_rejected_before_any_remote_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .expect(0)
        .mount(&server)
        .await;

    let (pipeline, _store, _temp_dir) = test_pipeline(&server).await;

    let result = pipeline.ingest("   \n\t ", "a@x.com", "Alice", false).await;
    assert!(matches!(result, Err(DocativeError::EmptyContent)));
}

#[tokio::test]
async fn second_ingest_without_replace_is_a_conflict() {
    let server = mock_embeddings_server().await;
    let (pipeline, store, _temp_dir) = test_pipeline(&server).await;

    let first_bot_id = pipeline
        .ingest("Alice is a backend engineer.", "a@x.com", "Alice", false)
        .await
        .expect("first ingest");

    let result = pipeline
        .ingest("Different content entirely.", "a@x.com", "Alice", false)
        .await;

    match result {
        Err(DocativeError::ExistingBot(existing)) => assert_eq!(existing, first_bot_id),
        other => panic!("expected ExistingBot, got {:?}", other.map(|_| ())),
    }

    // The original bot's chunks are untouched.
    let chunks = store
        .find_by_filter(&ChunkFilter::BotId(first_bot_id), 10)
        .await
        .expect("query");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "Alice is a backend engineer.");
}

#[tokio::test]
async fn replace_leaves_exactly_one_bot_and_no_old_chunks() {
    let server = mock_embeddings_server().await;
    let (pipeline, store, _temp_dir) = test_pipeline(&server).await;

    let old_bot_id = pipeline
        .ingest("Old content.", "a@x.com", "Alice", false)
        .await
        .expect("first ingest");

    let new_bot_id = pipeline
        .ingest("New content.", "a@x.com", "Alice", true)
        .await
        .expect("replace ingest");
    assert_ne!(old_bot_id, new_bot_id);

    assert!(
        store
            .find_by_filter(&ChunkFilter::BotId(old_bot_id), 10)
            .await
            .expect("query")
            .is_empty(),
        "no chunks may remain under the old identity"
    );

    let owner_chunks = store
        .find_by_filter(&ChunkFilter::OwnerEmail("a@x.com".to_string()), 100)
        .await
        .expect("query");
    assert!(!owner_chunks.is_empty());
    assert!(owner_chunks.iter().all(|c| c.bot_id == new_bot_id));
}

#[tokio::test]
async fn embedding_failure_aborts_the_ingestion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .mount(&server)
        .await;

    let (pipeline, _store, _temp_dir) = test_pipeline(&server).await;

    let result = pipeline
        .ingest("Alice is a backend engineer.", "a@x.com", "Alice", false)
        .await;
    assert!(matches!(result, Err(DocativeError::Embedding(_))));

    // Nothing was written, so the owner still has no bot.
    assert_eq!(
        pipeline
            .find_bot_for_owner("a@x.com")
            .await
            .expect("lookup"),
        None
    );
}

#[tokio::test]
async fn owners_do_not_interfere_with_each_other() {
    let server = mock_embeddings_server().await;
    let (pipeline, _store, _temp_dir) = test_pipeline(&server).await;

    let alice_bot = pipeline
        .ingest("Alice content.", "a@x.com", "Alice", false)
        .await
        .expect("ingest alice");
    let bob_bot = pipeline
        .ingest("Bob content.", "b@x.com", "Bob", false)
        .await
        .expect("ingest bob");

    assert_ne!(alice_bot, bob_bot);
    assert_eq!(
        pipeline.find_bot_for_owner("a@x.com").await.expect("lookup"),
        Some(alice_bot)
    );
    assert_eq!(
        pipeline.find_bot_for_owner("b@x.com").await.expect("lookup"),
        Some(bob_bot)
    );
}
