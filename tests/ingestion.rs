mod common;

use std::sync::Arc;

use catalog_assistant::embedding::HashingEmbedder;
use catalog_assistant::index::IndexOutcome;
use catalog_assistant::ingest::{CancellationToken, IngestOptions};

use common::{ScriptedCompletion, INDEX_NAME};

const CHEDDAR: &str =
    r#"[{"name":"Sharp Cheddar","category":"Cheese Wheel","price":"12.50","SKU_number":"SKU1"}]"#;

const CATALOG: &str = r#"[
    {"name":"Sharp Cheddar","category":"Cheese Wheel","price":"12.50","SKU_number":"SKU1"},
    {"name":"Whipped Cream Cheese","category":"Cream Cheese","price":3.25,"SKU_number":"SKU2","brand":"Dairyland"},
    {"name":"Feta Crumbles","category":"Crumbled, Cubed, Grated, Shaved","price":4,"LB_price":8.0},
    {"category":"Cheese Loaf","price":9}
]"#;

#[tokio::test]
async fn cheddar_is_searchable_and_queryable_after_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(
        "SELECT * FROM products WHERE category = 'Cheese Wheel'",
        "unused",
    ));
    let services = common::services(dir.path(), completion).await;
    let input = common::write_catalog(dir.path(), CHEDDAR);

    let report = services
        .ingestion_pipeline()
        .ingest_file(&input, IngestOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(report.dimension, 256);

    let query = HashingEmbedder::new(256).embed_text("sharp cheddar");
    let matches = services.index.search(INDEX_NAME, &query, 3).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "product_SKU1");
    assert!(matches[0].score > 0.0);
    assert_eq!(matches[0].metadata.price, 12.5);

    let outcome = services.router().route("find cheese wheels").await;
    assert_eq!(
        outcome.generated_query.as_deref(),
        Some("SELECT * FROM products WHERE category = 'Cheese Wheel'")
    );
    match outcome.grounding {
        catalog_assistant::router::GroundingContext::Rows(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].text("name"), "Sharp Cheddar");
            assert_eq!(rows[0].text("sku"), "SKU1");
            assert_eq!(rows[0].number("price"), Some(12.5));
        }
        other => panic!("expected structured rows, got {:?}", other),
    }
}

#[tokio::test]
async fn ingesting_twice_keeps_exactly_n_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let services =
        common::services(dir.path(), Arc::new(ScriptedCompletion::new("SELECT 1", "x"))).await;
    let input = common::write_catalog(dir.path(), CATALOG);
    let pipeline = services.ingestion_pipeline();
    let cancel = CancellationToken::new();

    let first = pipeline
        .ingest_file(&input, IngestOptions::default(), &cancel)
        .await
        .unwrap();
    let second = pipeline
        .ingest_file(&input, IngestOptions::default(), &cancel)
        .await
        .unwrap();

    assert_eq!(first.records, 3);
    assert_eq!(first.skipped, vec![3]);
    assert_eq!(first.index_outcome, IndexOutcome::Created);
    assert_eq!(second.index_outcome, IndexOutcome::Reused);
    assert_eq!(services.index.count(INDEX_NAME).await.unwrap(), 3);
    assert_eq!(services.store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn forced_recreate_still_holds_n_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let services =
        common::services(dir.path(), Arc::new(ScriptedCompletion::new("SELECT 1", "x"))).await;
    let input = common::write_catalog(dir.path(), CATALOG);
    let pipeline = services.ingestion_pipeline();
    let cancel = CancellationToken::new();

    pipeline
        .ingest_file(&input, IngestOptions::default(), &cancel)
        .await
        .unwrap();
    let report = pipeline
        .ingest_file(&input, IngestOptions { recreate: true }, &cancel)
        .await
        .unwrap();

    assert_eq!(report.index_outcome, IndexOutcome::Recreated);
    assert_eq!(services.index.count(INDEX_NAME).await.unwrap(), 3);
}

#[tokio::test]
async fn malformed_catalog_aborts_before_touching_stores() {
    let dir = tempfile::tempdir().unwrap();
    let services =
        common::services(dir.path(), Arc::new(ScriptedCompletion::new("SELECT 1", "x"))).await;
    let input = common::write_catalog(dir.path(), r#"[{"name":"Brie"}, 7]"#);

    let result = services
        .ingestion_pipeline()
        .ingest_file(&input, IngestOptions::default(), &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(services.index.count(INDEX_NAME).await.unwrap(), 0);
    assert_eq!(services.store.count().await.unwrap(), 0);
}
