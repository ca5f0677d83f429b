// ABOUTME: HTTP server for listing-scout: configuration, shared state, workflow orchestration, and routes.
// ABOUTME: Uses Axum with a shared, read-only application state injected into every handler.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;
pub mod workflow;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, ScoutConfig};
pub use routes::create_router;
pub use workflow::{WorkflowError, WorkflowInput, WorkflowOutput, run_workflow};
