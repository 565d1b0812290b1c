pub mod api;
pub mod dashboard;
pub mod error;
pub mod interface;
pub mod models;
pub mod server;
pub mod systems;
pub mod utils;
