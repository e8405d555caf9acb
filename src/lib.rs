//! Questline Library
//!
//! Core components of the campus scavenger hunt backend: the real-time
//! hunt/team channels, the directory and message store, and the REST
//! surface over both.

pub mod api;
pub mod geo;
pub mod store;
pub mod ws;
