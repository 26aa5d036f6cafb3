//! Pressroom Storage - Database and file storage
//!
//! PostgreSQL pool and embedded migrations, typed row models, per-entity
//! repositories and the local file store used for uploads.

pub mod db;
pub mod file;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use file::{FileStorage, LocalStorage};
pub use models::*;
pub use repository::*;
