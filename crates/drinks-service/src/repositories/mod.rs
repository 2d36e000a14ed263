//! Repository layer for the drinks service.
//!
//! Handlers depend on the [`DrinkRepository`] trait; the PostgreSQL and
//! in-memory implementations are chosen at startup.

pub mod drinks;
pub mod memory;

pub use drinks::{DrinkRepository, PgDrinkRepository};
pub use memory::InMemoryDrinkRepository;
