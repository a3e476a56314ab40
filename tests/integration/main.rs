//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! downloader and full crawls end-to-end.

mod common;
mod crawl_tests;
mod download_tests;
