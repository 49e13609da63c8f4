//! Test helpers module
//!
//! This module provides utilities and helpers for testing the Digital Menu
//! backend: an in-memory catalog store, payload and principal builders,
//! and an optional PostgreSQL test database.

#![allow(dead_code)]

pub mod database_helper;
pub mod memory_store;
pub mod test_data;

pub use database_helper::*;
pub use memory_store::*;
pub use test_data::*;
