//! Storage traits

use crate::error::StorageError;
use crate::records::{NewUser, User, Worker, WorkerFields};
use async_trait::async_trait;
use sentinel_core::{NewViolation, ViolationRecord};

/// Append-only violation log.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Persist a violation, returning it with its assigned id.
    async fn insert_violation(&self, violation: &NewViolation) -> Result<ViolationRecord, StorageError>;

    /// All violations, newest first.
    async fn list_violations(&self) -> Result<Vec<ViolationRecord>, StorageError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StorageError::AlreadyExists`] if the e-mail is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn get_user(&self, id: u64) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn create_worker(&self, fields: WorkerFields) -> Result<Worker, StorageError>;

    /// All workers ordered by id.
    async fn list_workers(&self) -> Result<Vec<Worker>, StorageError>;

    async fn get_worker(&self, id: u64) -> Result<Option<Worker>, StorageError>;

    /// `None` if no worker has `id`.
    async fn update_worker(&self, id: u64, fields: WorkerFields) -> Result<Option<Worker>, StorageError>;

    /// Whether a worker was removed.
    async fn delete_worker(&self, id: u64) -> Result<bool, StorageError>;
}
