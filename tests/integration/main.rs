//! Integration tests. They need a running PostgreSQL (`DATABASE_URL`) and,
//! for the HTTP tests, a running server.
//!
//! Run with: cargo test --test integration -- --ignored

mod common;
mod inventory_tests;
