//! TinyApp: a small URL shortener with accounts and per-user URLs
//!
//! This module exposes internal components for testing and potential library usage.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod flash;
pub mod handler;
pub mod keygen;
pub mod middleware;
pub mod model;
pub mod route;
pub mod view;
