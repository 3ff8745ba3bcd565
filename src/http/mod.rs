pub mod admin;
pub mod app_error;
pub mod health;
pub mod prometheus;
pub mod server;
pub mod state;
