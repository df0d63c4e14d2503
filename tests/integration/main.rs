//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to stand in for the listing endpoint and the
//! detail pages, and run full scrapes against a temporary database.

mod common;
mod pipeline_tests;
