pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod persistence;
pub mod routes;
pub mod service;
pub mod startup;
pub mod telemetry;
