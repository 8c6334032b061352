//! Domain core of resinkeep: entities, persistence, search, change
//! notifications and the mutation rules tying them together.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod broker;
pub mod color;
pub mod entities;
pub mod error;
pub mod mutation;
pub mod query;
pub mod store;
pub mod units;

pub use error::DomainError;
