//! Request middleware: session loading and the `/admin*` / `/account*` guards.

pub mod guards;
pub mod session;
