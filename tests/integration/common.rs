//! Shared fixtures: configuration, catalog database and product pages

use attribute_miner::catalog::initialize_schema;
use attribute_miner::config::{
    Config, FetcherConfig, LearnerConfig, OrchestratorConfig, OutputConfig, SiteConfig,
    UserAgentConfig,
};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wiremock::ResponseTemplate;

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestMiner".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Fetcher settings with delays short enough for tests
pub fn fast_fetcher() -> FetcherConfig {
    FetcherConfig {
        timeout_secs: 5,
        max_retries: 2,
        base_delay_ms: 10,
        max_delay_ms: 50,
        rate_limit_backoff_factor: 2.0,
        min_request_interval_ms: 0,
    }
}

pub fn site(base_url: &str) -> SiteConfig {
    SiteConfig {
        id: "shop".to_string(),
        base_url: base_url.to_string(),
        search_path: "/search?q={query}".to_string(),
        product_link_selector: "a.product".to_string(),
        title_selector: "h1".to_string(),
        description_selector: "div.description".to_string(),
        fields: BTreeMap::new(),
    }
}

/// Full configuration with every output path inside `dir`
pub fn config(base_url: &str, dir: &Path) -> Config {
    Config {
        learner: LearnerConfig::default(),
        fetcher: fast_fetcher(),
        user_agent: user_agent(),
        site: site(base_url),
        orchestrator: OrchestratorConfig {
            products_per_category: 3,
            progress_interval: 1,
        },
        output: OutputConfig {
            catalog_path: dir.join("catalog.db"),
            output_dir: dir.join("logs"),
            rules_dir: dir.join("rules"),
            checkpoint_path: dir.join("checkpoint.json"),
            report_path: dir.join("report.json"),
            library_path: dir.join("library.json"),
        },
    }
}

/// Writes a catalog with the given categories, all sharing one product definition
pub fn write_catalog(path: &Path, categories: &[&str]) -> PathBuf {
    let conn = Connection::open(path).unwrap();
    initialize_schema(&conn).unwrap();

    conn.execute("INSERT INTO product_defs (id, name) VALUES (1, 'Case')", [])
        .unwrap();
    for (name, datatype) in [("brand", "STRING"), ("item_weight", "STRING"), ("color", "STRING")] {
        conn.execute(
            "INSERT INTO product_def_attributes (product_def_id, name, datatype) VALUES (1, ?1, ?2)",
            params![name, datatype],
        )
        .unwrap();
    }
    for name in categories {
        conn.execute(
            "INSERT INTO categories (name, product_def_id) VALUES (?1, 1)",
            params![name],
        )
        .unwrap();
    }

    path.to_path_buf()
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// Search results page linking to the given product paths
pub fn search_page(paths: &[&str]) -> String {
    let links: String = paths
        .iter()
        .enumerate()
        .map(|(i, path)| format!(r#"<li><a class="product" href="{}">Product {}</a></li>"#, path, i))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", links)
}

/// Product page with a specification table and a text description
pub fn product_page(brand: &str, weight: &str, material: &str) -> String {
    spec_table_page(brand, material, &[("Brand", brand), ("Item Weight", weight)])
}

/// Same page with the weight row above the brand row
pub fn product_page_weight_first(brand: &str, weight: &str, material: &str) -> String {
    spec_table_page(brand, material, &[("Item Weight", weight), ("Brand", brand)])
}

fn spec_table_page(brand: &str, material: &str, rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(label, value)| format!("<tr><th>{}</th><td>{}</td></tr>", label, value))
        .collect();
    format!(
        r#"<html><body>
           <h1>{} Case</h1>
           <div class="description"><p>Material: {}</p><p>Fits most phones</p></div>
           <table id="specs">{}</table>
           </body></html>"#,
        brand, material, rows
    )
}
