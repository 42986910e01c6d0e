pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod orders;
pub mod paypal;
pub mod routes;
pub mod subscriptions;

pub use config::{PaypalConfig, BIND_ADDRESS, BIND_PORT};
pub use routes::{api_routes, app, with_metrics};
