//! sentinel-storage: persistence for violations, users and workers
//!
//! The stores are traits so the server can be driven against an in-memory
//! or failing implementation in tests. [`SledStore`] is the embedded
//! implementation used by the binary.

pub mod artifacts;
pub mod error;
pub mod records;
pub mod sled_store;
pub mod store;

pub use artifacts::ArtifactWriter;
pub use error::StorageError;
pub use records::{NewUser, User, Worker, WorkerFields};
pub use sled_store::SledStore;
pub use store::{UserStore, ViolationStore, WorkerStore};
