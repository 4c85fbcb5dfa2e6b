// ABOUTME: Library root for dockgate - a gateway in front of many Docker daemons.
// ABOUTME: The main binary is in main.rs.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod repository;
pub mod runtime;
pub mod types;
