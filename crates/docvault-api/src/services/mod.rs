//! Application services sitting between the handlers and the repositories.

pub mod archive;
pub mod removal;
pub mod upload;
