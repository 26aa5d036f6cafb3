//! API request handlers

pub mod ai;
pub mod api_keys;
pub mod campaigns;
pub mod contacts;
pub mod health;
pub mod posts;
pub mod settings;
pub mod smtp_configs;
pub mod uploads;

pub use health::*;
