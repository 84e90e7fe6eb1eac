//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Storage gateways (PostgreSQL and in-memory)
//! - The Redis group mirror
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
