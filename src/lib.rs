// src/lib.rs

pub mod config;
pub mod details;
pub mod error;
pub mod export;
pub mod fetch;
pub mod json;
pub mod rounds;
pub mod seasons;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;
