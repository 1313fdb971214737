//! Service layer around the `epp-algo` assessment engine: configuration,
//! tracing setup, persistence and the async operations callers invoke.

pub mod config;
pub mod logging;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::{AppState, StateError};
pub use store::{Store, StoreError};
