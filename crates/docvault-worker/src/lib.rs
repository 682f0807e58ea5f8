//! Background machinery keeping the object store consistent with the ledger:
//! the asynchronous blob removal queue and the periodic reconciliation sweeps.

pub mod audit_store;
pub mod removal;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use audit_store::DeletionAuditStore;
pub use removal::{BlobRemovalQueue, RemovalQueueConfig};
pub use sweeper::{Sweeper, SweeperConfig, SweeperHandle};
