//! HTTP request handlers, grouped by surface: document graph CRUD and
//! search, attachment file operations, reference data, health.

pub mod documents;
pub mod files;
pub mod health;
pub mod reference;
