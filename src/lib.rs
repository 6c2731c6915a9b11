pub mod api;
pub mod bus;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod utils;
