pub mod api;
pub mod cli;
pub mod collector;
pub mod context;
pub mod exporter;
pub mod formatter;
pub mod models;
pub mod services;
pub mod settings;
