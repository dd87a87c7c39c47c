pub mod app;
pub mod backend;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod logging;
pub mod models;
pub mod system;
pub mod ui;
