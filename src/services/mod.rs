//! Domain services behind the middleware and routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own persistence and provider details so the middleware
//! and route table stay focused on request plumbing.

pub mod oauth;
pub mod session;
pub mod user;
