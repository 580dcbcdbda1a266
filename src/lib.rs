pub mod api;
pub mod api_error;
pub mod app;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod bot;
pub mod config;
pub mod db;
pub mod reports;
pub mod scheduler;
pub mod services;
