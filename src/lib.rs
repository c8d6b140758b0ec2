//! Birthday Page - a password-gated page behind a single IP-bound session
//!
//! This library provides the session store, password lookup, templates and
//! HTTP handlers used by the `birthday_page` server binary.

pub mod api;
pub mod clock;
pub mod config;
pub mod secrets;
pub mod session;
pub mod templates;
