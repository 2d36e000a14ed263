//! HTTP request handlers for the drinks service.

pub mod drinks;
pub mod health;
pub mod metrics;

pub use drinks::{create_drink, delete_drink, list_drinks, list_drinks_detail, update_drink};
pub use health::health_check;
pub use metrics::metrics_handler;
