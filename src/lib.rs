pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod notify;
pub mod report;
pub mod types;

#[cfg(test)]
pub mod testing;
