pub mod acquire;
pub mod config;
pub mod error;
pub mod fetch;
pub mod process;
pub mod query;
pub mod summary;
