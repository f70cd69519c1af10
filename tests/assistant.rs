mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_assistant::context::ConversationWindow;
use catalog_assistant::core::errors::ServiceError;
use catalog_assistant::ingest::{CancellationToken, IngestOptions};
use catalog_assistant::router::{GroundingContext, RouteState, NO_INFORMATION};
use catalog_assistant::sql::QueryExecutor;

use common::ScriptedCompletion;

const CATALOG: &str = r#"[
    {"name":"Sharp Cheddar","category":"Cheese Wheel","price":"12.50","SKU_number":"SKU1"},
    {"name":"Aged Gouda Wheel","category":"Cheese Wheel","price":30,"SKU_number":"SKU2"},
    {"name":"Whipped Cream Cheese","category":"Cream Cheese","price":3.25,"SKU_number":"SKU3"},
    {"name":"Feta Crumbles","category":"Crumbled, Cubed, Grated, Shaved","price":4,"SKU_number":"SKU4"}
]"#;

async fn ingested(
    dir: &std::path::Path,
    completion: Arc<ScriptedCompletion>,
) -> catalog_assistant::state::Services {
    let services = common::services(dir, completion).await;
    let input = common::write_catalog(dir, CATALOG);
    services
        .ingestion_pipeline()
        .ingest_file(&input, IngestOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    services
}

#[tokio::test]
async fn structured_rows_ground_the_answer_exclusively() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(
        "```sql\nSELECT * FROM products WHERE category = 'Cheese Wheel'\n```",
        "We have Sharp Cheddar and Aged Gouda Wheel.",
    ));
    let services = ingested(dir.path(), completion.clone()).await;
    let assistant = services.assistant().await.unwrap();
    let mut window = ConversationWindow::new(services.window_config());

    let reply = assistant.ask(&mut window, "which wheels?").await.unwrap();

    assert_eq!(reply.answer, "We have Sharp Cheddar and Aged Gouda Wheel.");
    assert_eq!(reply.grounding.len(), 2);
    assert!(reply.route.contains(&RouteState::SqlGrounded));
    let prompt = &completion.answer_prompts()[0];
    assert!(prompt.contains("Current Product Information:\nProduct: Sharp Cheddar"));
    assert!(!prompt.contains("Similarity Score"));
    assert!(prompt.ends_with("Question: which wheels?"));
    assert_eq!(window.len(), 2);
}

#[tokio::test]
async fn empty_rows_fall_back_to_three_vector_matches() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(
        "SELECT * FROM products WHERE price > 1000",
        "Try the Feta Crumbles.",
    ));
    let services = ingested(dir.path(), completion.clone()).await;
    let assistant = services.assistant().await.unwrap();
    let mut window = ConversationWindow::new(services.window_config());

    let reply = assistant
        .ask(&mut window, "feta crumbles for salad")
        .await
        .unwrap();

    match &reply.grounding {
        GroundingContext::Matches(matches) => {
            assert_eq!(matches.len(), 3);
            assert_eq!(matches[0].id, "product_SKU4");
        }
        other => panic!("expected vector matches, got {:?}", other),
    }
    assert!(completion.answer_prompts()[0].contains("Similarity Score"));
}

#[tokio::test]
async fn history_prefixes_the_next_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(
        "SELECT name FROM products WHERE sku = 'SKU1'",
        "Sharp Cheddar is $12.50.",
    ));
    let services = ingested(dir.path(), completion.clone()).await;
    let assistant = services.assistant().await.unwrap();
    let mut window = ConversationWindow::new(services.window_config());

    assistant.ask(&mut window, "price of SKU1?").await.unwrap();
    assistant.ask(&mut window, "and its brand?").await.unwrap();

    let prompts = completion.answer_prompts();
    assert!(prompts[0].starts_with("Context:\n\n\nCurrent Product Information:"));
    assert!(prompts[1].starts_with(
        "Context:\nPrevious conversation:\nuser: price of SKU1?\nassistant: Sharp Cheddar is $12.50.\n"
    ));
    assert_eq!(window.len(), 4);
}

#[tokio::test]
async fn generation_failure_leaves_history_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion {
        answer: Err(ServiceError::Timeout(std::time::Duration::from_secs(60))),
        ..ScriptedCompletion::new("SELECT * FROM products", "unused")
    });
    let services = ingested(dir.path(), completion).await;
    let assistant = services.assistant().await.unwrap();
    let mut window = ConversationWindow::new(services.window_config());

    let err = assistant.ask(&mut window, "anything?").await.unwrap_err();

    assert!(matches!(err.source, ServiceError::Timeout(_)));
    assert!(window.is_empty());
}

#[tokio::test]
async fn nothing_found_uses_the_no_information_marker() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(
        "SELECT * FROM products WHERE 0",
        "I'm sorry, I don't have enough information on that product.",
    ));
    // No ingestion: both the row store and the index are empty.
    let services = common::services(dir.path(), completion.clone()).await;
    let assistant = services.assistant().await.unwrap();
    let mut window = ConversationWindow::new(services.window_config());

    let reply = assistant.ask(&mut window, "camembert?").await.unwrap();

    assert_eq!(reply.grounding, GroundingContext::NoInformation);
    assert!(completion.answer_prompts()[0].contains(NO_INFORMATION));
}

#[tokio::test]
async fn runaway_structured_query_falls_back_without_starving_later_queries() {
    let dir = tempfile::tempdir().unwrap();
    let tuning = dir.path().join("tuning.yaml");
    std::fs::write(&tuning, "query:\n  execution_timeout_secs: 1\n").unwrap();
    let settings = common::offline_settings_with(
        dir.path(),
        &[("CATALOG_CONFIG_PATH", tuning.to_str().unwrap())],
    );
    let completion = Arc::new(ScriptedCompletion::new(
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
        "Feta Crumbles it is.",
    ));
    let services = common::services_with(settings, completion).await;
    let input = common::write_catalog(dir.path(), CATALOG);
    services
        .ingestion_pipeline()
        .ingest_file(&input, IngestOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    let router = services.router();

    for _ in 0..5 {
        let outcome = router.route("feta crumbles").await;
        assert!(matches!(
            outcome.query_error,
            Some(catalog_assistant::core::errors::QueryError::Timeout(_))
        ));
        assert_eq!(
            outcome.final_grounding_state(),
            Some(RouteState::VectorGrounded)
        );
    }

    let executor = QueryExecutor::new(services.store.reader(), Duration::from_secs(1));
    let rows = executor.execute("SELECT name FROM products").await.unwrap();
    assert_eq!(rows.len(), 4);
}
