// src/lib.rs — Library root for repochat

pub mod api;
pub mod cli;
pub mod conversation;
pub mod core;
pub mod infra;
pub mod ingest;
pub mod memory;
pub mod provider;
