//! Shared types and models for the Larder cost-accounting platform
//!
//! This crate contains the plain record types exchanged between the
//! valuation engine, the storage adapters and the surrounding tooling.
//! Nothing in here depends on a storage or transport framework.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
