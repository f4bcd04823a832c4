//! Integration tests for Attribute-Miner
//!
//! These tests use wiremock to stand in for the mined site and a temporary
//! SQLite catalog, and exercise fetching, scraping and whole batch runs.

mod common;
mod fetcher_tests;
mod orchestrator_tests;
