pub mod bootstrap;
pub mod config;
pub mod error;
pub mod model;
pub mod routes;
pub mod state;
