//! Integration tests against a running server and database.
//!
//! Run with: cargo test --test integration -- --ignored

mod api_tests;
mod common;
mod library_tests;
mod roster_tests;
mod scan_tests;
