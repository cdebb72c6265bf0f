//! Durable storage for the contract and payment domain.
//!
//! Two implementations of the `pactum-core` storage traits live here: a
//! Postgres-backed [`PgStore`] used by the running service, and an in-memory
//! [`MemStore`] used by tests and local development. Both enforce the same
//! uniqueness rules and conditional status transitions so the engine behaves
//! identically against either.

pub mod mem;
pub mod pg;

pub use mem::MemStore;
pub use pg::PgStore;
