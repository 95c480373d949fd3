//! AirdropHunter listing and admin API.

pub mod catalog;
pub mod client;
pub mod config;
pub mod entities;
pub mod feed;
pub mod http;
pub mod models;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;
