//! Shared helpers for integration tests.

pub mod object_server;
