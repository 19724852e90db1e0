//! Backend service integration
//!
//! The backend receives terminal status updates over HTTP. The transport
//! sits behind [`BackendClient`] so the notifier's retry loop can run
//! against a scripted client in tests.

pub mod client;
pub mod notifier;

pub use client::{BackendClient, BackendResponse, HttpBackendClient};
pub use notifier::BackendNotifier;
