//! Book digitization station: workflows, pluggable capture drivers and
//! processing extensions, a bounded job queue drained by one background
//! worker, and a small HTTP API on top.

pub mod api;
pub mod background;
pub mod bootstrap;
pub mod common;
pub mod config;
pub mod database;
pub mod extensions;
pub mod models;
pub mod operations;
pub mod schema;
pub mod utils;
