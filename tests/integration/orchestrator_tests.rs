//! End-to-end batch runs against a mock site and a temporary catalog

use crate::common::{
    config, html, product_page, product_page_weight_first, search_page, write_catalog,
};
use attribute_miner::catalog::{
    AttributeDefinition, Catalog, CatalogError, CatalogResult, CategoryRecord, SqliteCatalog,
};
use attribute_miner::config::Config;
use attribute_miner::consolidate::consolidate;
use attribute_miner::orchestrator::{
    cleanup, log_path, CategoryLog, CleanupReason, ResumableOrchestrator, RunOptions,
};
use attribute_miner::output::RunReport;
use attribute_miner::rules::RuleStore;
use attribute_miner::state::{CategoryState, CheckpointStore};
use std::sync::atomic::Ordering;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer};

/// Mounts a site where "Phone Cases" has three products and "Cables" has none
///
/// The second product lists its specification rows in a different order.
async fn mount_site(server: &MockServer, phone_case_searches: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Phone Cases"))
        .respond_with(html(search_page(&["/p/1", "/p/2", "/p/3"])))
        .expect(phone_case_searches)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Cables"))
        .respond_with(html(search_page(&[])))
        .mount(server)
        .await;

    for (id, brand, weight, material) in [
        (1, "Acme", "30 g", "Silicone"),
        (2, "Globex", "45 g", "Leather"),
        (3, "Initech", "28 g", "Plastic"),
    ] {
        let body = if id == 2 {
            product_page_weight_first(brand, weight, material)
        } else {
            product_page(brand, weight, material)
        };
        Mock::given(method("GET"))
            .and(path(format!("/p/{}", id)))
            .respond_with(html(body))
            .mount(server)
            .await;
    }
}

/// Catalog whose schema lookup fails for one category
struct BrokenSchemaCatalog {
    inner: SqliteCatalog,
    broken: &'static str,
}

impl Catalog for BrokenSchemaCatalog {
    fn load_categories(&self) -> CatalogResult<Vec<CategoryRecord>> {
        self.inner.load_categories()
    }

    fn required_attributes(
        &self,
        category: &CategoryRecord,
    ) -> CatalogResult<Vec<AttributeDefinition>> {
        if category.name == self.broken {
            return Err(CatalogError::NotFound(format!("schema of {}", category.name)));
        }
        self.inner.required_attributes(category)
    }
}

fn setup(server: &MockServer, dir: &TempDir) -> Config {
    let config = config(&server.uri(), dir.path());
    write_catalog(&config.output.catalog_path, &["Phone Cases", "Cables"]);
    config
}

#[tokio::test]
async fn test_full_run() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    let mut orchestrator = ResumableOrchestrator::new(&config, "test-hash").unwrap();
    let report = orchestrator.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.total_categories, 2);
    assert_eq!(report.categories_processed, 1);
    assert_eq!(report.categories_with_patterns, 1);
    assert_eq!(report.categories_failed, 1);
    assert_eq!(report.total_products_scraped, 3);
    assert_eq!(report.success_rate, 100.0);
    assert_eq!(report.config_hash, "test-hash");
    assert!(!report.interrupted);
    assert_eq!(report.failed_categories[0].name, "Cables");

    // Report on disk matches the returned one
    assert_eq!(RunReport::load(&config.output.report_path).unwrap(), report);

    // One checkpoint entry per category, failures included
    let record = CheckpointStore::new(&config.output.checkpoint_path)
        .load()
        .unwrap();
    let ids: Vec<i64> = record.processed_categories.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(record.last_category_id, Some(2));

    // Learned category log carries extracted and validated products
    let log = CategoryLog::read(&log_path(&config.output.output_dir, "shop", "Phone Cases"))
        .unwrap();
    assert_eq!(log.outcome, CategoryState::Learned);
    assert_eq!(log.products_found, 3);
    assert!(log.patterns_learned);
    assert_eq!(log.products[0].attributes.get("brand").map(String::as_str), Some("Acme"));
    assert_eq!(
        log.products[1].attributes.get("item_weight").map(String::as_str),
        Some("45 g")
    );
    assert_eq!(log.products[1].attributes.get("brand").map(String::as_str), Some("Globex"));
    let validation = log.products[0].validation.as_ref().unwrap();
    assert!(validation.missing.contains("color"));
    assert!(validation.coverage > 0.0 && validation.coverage < 1.0);

    // Failed category still has a log
    let failed = CategoryLog::read(&log_path(&config.output.output_dir, "shop", "Cables")).unwrap();
    assert_eq!(failed.outcome, CategoryState::Failed);
    assert!(failed.error.is_some());

    // Rules were saved for the learned category
    let mut store = RuleStore::new(&config.output.rules_dir);
    let rules = store.load("Phone Cases", "shop").unwrap();
    assert!(rules.patterns_learned);
    assert_eq!(rules.products_analyzed, 3);
    assert!(!rules.rules_for("brand").is_empty());
}

#[tokio::test]
async fn test_resume_skips_processed_categories() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    let second = ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    assert_eq!(second.total_categories, 2);
    assert!(second.outcomes.is_empty());
    assert_eq!(second.categories_processed, 0);

    let record = CheckpointStore::new(&config.output.checkpoint_path)
        .load()
        .unwrap();
    assert_eq!(record.len(), 2);
}

#[tokio::test]
async fn test_target_list_reuses_stored_rules() {
    let server = MockServer::start().await;
    mount_site(&server, 2).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();
    let rules_path = RuleStore::new(&config.output.rules_dir).path_for("Phone Cases", "shop");
    let first_rules = std::fs::read_to_string(&rules_path).unwrap();

    let options = RunOptions {
        target_names: vec!["Phone Cases".to_string(), "Unknown".to_string()],
        ..RunOptions::default()
    };
    let report = ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&options)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].outcome, CategoryState::Learned);
    assert_eq!(std::fs::read_to_string(&rules_path).unwrap(), first_rules);

    let record = CheckpointStore::new(&config.output.checkpoint_path)
        .load()
        .unwrap();
    assert_eq!(record.len(), 3);
    assert_eq!(record.last_category_id, Some(1));
}

#[tokio::test]
async fn test_stop_flag_interrupts_run() {
    let server = MockServer::start().await;
    mount_site(&server, 0).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    let mut orchestrator = ResumableOrchestrator::new(&config, "hash").unwrap();
    orchestrator.stop_handle().store(true, Ordering::SeqCst);
    let report = orchestrator.run(&RunOptions::default()).await.unwrap();

    assert!(report.interrupted);
    assert!(report.outcomes.is_empty());
    assert!(config.output.report_path.exists());
    assert!(!config.output.checkpoint_path.exists());
}

#[tokio::test]
async fn test_max_categories_limits_run() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    let options = RunOptions {
        max_categories: Some(1),
        ..RunOptions::default()
    };
    let report = ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&options)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].name, "Phone Cases");
}

#[tokio::test]
async fn test_cleanup_after_run_requeues_failed_category() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    let checkpoints = CheckpointStore::new(&config.output.checkpoint_path);
    let summary = cleanup(&config.output.output_dir, &checkpoints, false).unwrap();

    assert_eq!(summary.logs_scanned, 2);
    assert_eq!(summary.by_reason.get(&CleanupReason::NoProducts), Some(&1));
    assert_eq!(summary.remaining, 1);
    assert!(!log_path(&config.output.output_dir, "shop", "Cables").exists());

    let record = checkpoints.load().unwrap();
    assert_eq!(record.last_category_id, Some(1));
}

#[tokio::test]
async fn test_consolidate_stored_rules() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    let rule_sets = RuleStore::new(&config.output.rules_dir).load_all().unwrap();
    let library = consolidate(&rule_sets);

    assert_eq!(library.total_categories_processed, 1);
    assert_eq!(library.categories_with_patterns, 1);
    assert_eq!(library.total_products_analyzed, 3);
    assert!(library.unique_patterns_count >= 2);
}

#[tokio::test]
async fn test_schema_error_fails_only_that_category() {
    let server = MockServer::start().await;
    mount_site(&server, 0).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);

    let catalog = BrokenSchemaCatalog {
        inner: SqliteCatalog::open(&config.output.catalog_path).unwrap(),
        broken: "Phone Cases",
    };
    let report = ResumableOrchestrator::with_catalog(&config, Box::new(catalog), "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.categories_failed, 2);
    assert_eq!(RunReport::load(&config.output.report_path).unwrap(), report);

    let log = CategoryLog::read(&log_path(&config.output.output_dir, "shop", "Phone Cases"))
        .unwrap();
    assert_eq!(log.outcome, CategoryState::Failed);
    assert!(log.error.unwrap().contains("schema of Phone Cases"));
    assert_eq!(log.products_found, 0);
}

#[tokio::test]
async fn test_unwritten_log_is_not_checkpointed() {
    let server = MockServer::start().await;
    mount_site(&server, 2).await;
    let dir = TempDir::new().unwrap();
    let config = setup(&server, &dir);
    std::fs::write(&config.output.output_dir, "not a directory").unwrap();

    let first = ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();

    assert_eq!(first.outcomes.len(), 2);
    assert!(config.output.report_path.exists());
    assert!(!config.output.checkpoint_path.exists());

    // Both categories are still pending for the next run
    let second = ResumableOrchestrator::new(&config, "hash")
        .unwrap()
        .run(&RunOptions::default())
        .await
        .unwrap();
    assert_eq!(second.outcomes.len(), 2);
}
