//! Middleware for the Gatehouse API server.

pub mod auth;
