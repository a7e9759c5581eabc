pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod session;
pub mod state;
pub mod tenant;
pub mod types;

pub use routes::app;
pub use state::AppState;
