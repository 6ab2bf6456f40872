//! Integration tests
//!
//! `pipeline_tests` run without external services. The others need a live
//! PostgreSQL database or running server and are ignored by default:
//! `cargo test -- --ignored`.

mod api_tests;
mod pipeline_tests;
mod transfer_tests;
