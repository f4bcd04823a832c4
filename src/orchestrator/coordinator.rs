//! Batch coordinator - resumable category processing
//!
//! This module contains the main batch loop, which:
//! - Loads the catalog and the checkpoint
//! - Selects the categories to process
//! - Searches, fetches, learns and extracts each category in turn
//! - Persists a checkpoint entry after every category
//! - Handles interrupts and writes the final report

use crate::catalog::{Catalog, CategoryRecord, SqliteCatalog};
use crate::config::Config;
use crate::crawler::{HttpFetcher, ProductPage, SiteScraper};
use crate::extractor::{extract_with, validate, AttributeExtractor, PageContext};
use crate::learner::PatternLearner;
use crate::orchestrator::category_log::{CategoryLog, ProductRecord};
use crate::output::{CategoryOutcome, RunReport, RunStats};
use crate::rules::{RuleSet, RuleStore};
use crate::state::{CategoryState, CheckpointRecord, CheckpointStore};
use crate::{MinerError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Which categories a run processes
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pending categories skipped before processing starts
    pub start_from: usize,

    /// Upper bound on categories processed in this run
    pub max_categories: Option<usize>,

    /// Explicit category names; when set, the checkpoint is ignored
    pub target_names: Vec<String>,
}

/// Picks the categories a run processes, in catalog order
///
/// An explicit target list selects exactly the named categories, processed
/// or not. Otherwise categories already in the checkpoint are skipped, then
/// `start_from` and `max_categories` are applied.
pub fn select_categories(
    categories: Vec<CategoryRecord>,
    checkpoint: &CheckpointRecord,
    options: &RunOptions,
) -> Vec<CategoryRecord> {
    if !options.target_names.is_empty() {
        let known: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        for name in &options.target_names {
            if !known.contains(name.as_str()) {
                tracing::warn!("Category '{}' not found in catalog", name);
            }
        }

        let wanted: HashSet<&str> = options.target_names.iter().map(String::as_str).collect();
        return categories
            .into_iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .collect();
    }

    let processed = checkpoint.processed_ids();
    let pending = categories
        .into_iter()
        .filter(|c| !processed.contains(&c.id))
        .skip(options.start_from);

    match options.max_categories {
        Some(max) => pending.take(max).collect(),
        None => pending.collect(),
    }
}

/// Drives learning and extraction over catalog categories, resumably
pub struct ResumableOrchestrator {
    catalog: Box<dyn Catalog>,
    scraper: SiteScraper,
    learner: PatternLearner,
    extractor: AttributeExtractor,
    checkpoints: CheckpointStore,
    output_dir: PathBuf,
    report_path: PathBuf,
    products_per_category: usize,
    progress_interval: usize,
    config_hash: String,
    stop: Arc<AtomicBool>,
}

impl ResumableOrchestrator {
    /// Creates an orchestrator reading the SQLite catalog named in the config
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, stored in the report
    ///
    /// # Returns
    ///
    /// * `Ok(ResumableOrchestrator)` - Ready to run
    /// * `Err(MinerError)` - The catalog or HTTP client could not be opened
    pub fn new(config: &Config, config_hash: &str) -> Result<Self> {
        let catalog = SqliteCatalog::open(&config.output.catalog_path)?;
        Self::with_catalog(config, Box::new(catalog), config_hash)
    }

    /// Creates an orchestrator over any catalog implementation
    pub fn with_catalog(
        config: &Config,
        catalog: Box<dyn Catalog>,
        config_hash: &str,
    ) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetcher, &config.user_agent)?;
        let scraper = SiteScraper::new(&config.site, fetcher)?;

        Ok(Self {
            catalog,
            scraper,
            learner: PatternLearner::new(config.learner.clone()),
            extractor: AttributeExtractor::new(RuleStore::new(&config.output.rules_dir)),
            checkpoints: CheckpointStore::new(&config.output.checkpoint_path),
            output_dir: config.output.output_dir.clone(),
            report_path: config.output.report_path.clone(),
            products_per_category: config.orchestrator.products_per_category,
            progress_interval: config.orchestrator.progress_interval.max(1),
            config_hash: config_hash.to_string(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the run after the in-flight category when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Runs the batch
    ///
    /// Each selected category is processed in catalog order. A category
    /// failure is recorded and the batch moves on; a checkpoint write failure
    /// or an unreadable category list aborts the run. A category is only
    /// checkpointed once its log is on disk.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The final report, already written to disk
    /// * `Err(MinerError)` - The run was aborted
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunReport> {
        let start_time = Utc::now();
        let started = Instant::now();

        let categories = self.catalog.load_categories()?;
        let total_categories = categories.len();
        let mut record = self.checkpoints.load()?;
        let selected = select_categories(categories, &record, options);

        tracing::info!(
            "Starting run: {} categories selected, {} in catalog, {} already processed",
            selected.len(),
            total_categories,
            record.len()
        );

        let mut stats = RunStats::new(total_categories);
        let mut interrupted = false;

        for (index, category) in selected.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                tracing::warn!(
                    "Stop requested, leaving {} categories for the next run",
                    selected.len() - index
                );
                interrupted = true;
                break;
            }

            tracing::info!(
                "[{}/{}] Processing '{}' (id {})",
                index + 1,
                selected.len(),
                category.name,
                category.id
            );

            let log = self.process_category(category).await?;

            match log.write(&self.output_dir) {
                Ok(_) => {
                    record.append(category.id, &category.name);
                    self.checkpoints.save(&record)?;
                }
                Err(e) => tracing::error!(
                    "Failed to write log for '{}', leaving it for the next run: {}",
                    category.name,
                    e
                ),
            }

            stats.record(
                CategoryOutcome {
                    id: category.id,
                    name: category.name.clone(),
                    outcome: log.outcome,
                    products_found: log.products_found,
                    patterns_learned: log.patterns_learned,
                },
                log.error.as_deref(),
            );

            if stats.categories_finished() % self.progress_interval == 0 {
                stats.log_progress(started.elapsed());
            }
        }

        let report = RunReport::new(
            &stats,
            start_time,
            Utc::now(),
            &self.config_hash,
            interrupted,
        );
        report.save(&self.report_path)?;
        report.log_summary();

        Ok(report)
    }

    /// Processes one category and returns its log
    ///
    /// Errors while mining, schema lookups included, are folded into a
    /// `Failed` log.
    async fn process_category(&mut self, category: &CategoryRecord) -> Result<CategoryLog> {
        let mut log = CategoryLog::new(category, self.scraper.id());
        let state = log.outcome.transition(CategoryState::InProgress)?;

        let outcome = match self.mine_category(category, &mut log).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Category '{}' failed: {}", category.name, e);
                log.error = Some(e.to_string());
                CategoryState::Failed
            }
        };

        log.outcome = state.transition(outcome)?;
        tracing::info!(
            "'{}' finished: {} ({} products)",
            category.name,
            log.outcome,
            log.products_found
        );

        Ok(log)
    }

    async fn mine_category(
        &mut self,
        category: &CategoryRecord,
        log: &mut CategoryLog,
    ) -> Result<CategoryState> {
        let schema = self.catalog.required_attributes(category)?;

        let listings = self
            .scraper
            .search(&category.name, self.products_per_category)
            .await?;

        if listings.is_empty() {
            return Err(MinerError::Site {
                site: self.scraper.id().to_string(),
                message: format!("no products found for '{}'", category.name),
            });
        }

        let mut pages = Vec::with_capacity(listings.len());
        for listing in &listings {
            match self.scraper.fetch_product(listing).await {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!("Failed to fetch {}: {}", listing.url, e),
            }
        }

        if pages.is_empty() {
            return Err(MinerError::Site {
                site: self.scraper.id().to_string(),
                message: format!("none of {} product pages could be fetched", listings.len()),
            });
        }
        log.products_found = pages.len();

        let rule_set = self.rules_for(&category.name, &pages);
        log.patterns_learned = rule_set.patterns_learned;

        for page in &pages {
            let document = page.document();
            let context = PageContext::new(&document, &page.fields);
            let attributes = extract_with(&rule_set, &context);
            let validation = validate(&attributes, &schema);

            tracing::debug!(
                "{}: {} attributes, coverage {:.2}",
                page.url,
                attributes.len(),
                validation.coverage
            );

            log.products.push(ProductRecord {
                url: page.url.clone(),
                title: page.fields.name.clone(),
                attributes,
                validation: Some(validation),
            });
        }

        Ok(if rule_set.patterns_learned {
            CategoryState::Learned
        } else {
            CategoryState::NoPatterns
        })
    }

    /// Stored rules when a previous run learned some, otherwise freshly learned
    /// (and saved) rules
    fn rules_for(&mut self, category: &str, pages: &[ProductPage]) -> Arc<RuleSet> {
        let site = self.scraper.id().to_string();

        if let Some(stored) = self.extractor.rule_set(category, &site) {
            if stored.patterns_learned {
                tracing::info!(
                    "Reusing {} stored rules for '{}'",
                    stored.rule_count(),
                    category
                );
                return stored;
            }
        }

        let outcome = self.learner.learn(category, &site, pages);
        tracing::info!(
            "Learned {} rules for '{}' from {} pages",
            outcome.rule_set.rule_count(),
            category,
            outcome.rule_set.products_analyzed
        );

        let unsaved = outcome.rule_set.clone();
        match self.extractor.store_mut().save(outcome.rule_set) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Failed to save rules for '{}': {}", category, e);
                Arc::new(unsaved)
            }
        }
    }
}
