//! API Middleware
//!
//! Middleware layers for authentication and request capture.

pub mod auth;
pub mod capture;

pub use auth::{require_auth, AuthState, AuthUser};
pub use capture::{capture_requests, panic_response, CaptureState};
