//! Persistent storage for the client application.

pub mod config;
