// ABOUTME: API module containing the HTTP handler functions for the listing-scout REST API.
// ABOUTME: The health check lives in routes.rs; workflow execution lives here.

pub mod workflow;
