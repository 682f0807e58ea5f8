//! Repository implementations.

pub mod attachment;
pub mod audit;
pub mod document;
pub mod reference;
