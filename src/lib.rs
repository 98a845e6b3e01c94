// Public API for integration tests and embedding hosts

pub mod auth;
pub mod bot;
pub mod commands;
pub mod config;
pub mod damage;
pub mod error;
pub mod pairing;
pub mod prompt_pool;
pub mod protocol;
pub mod rules;
pub mod scheduler;
pub mod state;
pub mod types;
