//! Data models shared by the pipeline stages.

pub mod config;
pub mod payload;
pub mod record;
