//! Sled-backed stores

use crate::error::StorageError;
use crate::records::{NewUser, User, Worker, WorkerFields};
use crate::store::{UserStore, ViolationStore, WorkerStore};
use async_trait::async_trait;
use sentinel_core::violation::sort_newest_first;
use sentinel_core::{NewViolation, ViolationRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

const VIOLATIONS: &str = "violations";
const USERS: &str = "users";
const USER_EMAILS: &str = "user_emails";
const WORKERS: &str = "workers";
const SEQUENCES: &str = "sequences";

/// Embedded database holding violations, users and workers. Records are
/// JSON values keyed by big-endian ids, so iteration is in id order.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    violations: sled::Tree,
    users: sled::Tree,
    user_emails: sled::Tree,
    workers: sled::Tree,
    sequences: sled::Tree,
}

impl SledStore {
    /// Open (or create) the database under `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        info!("Opened violation store at {}", path.display());
        Self::from_db(db)
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            violations: db.open_tree(VIOLATIONS)?,
            users: db.open_tree(USERS)?,
            user_emails: db.open_tree(USER_EMAILS)?,
            workers: db.open_tree(WORKERS)?,
            sequences: db.open_tree(SEQUENCES)?,
            db,
        })
    }

    /// Flush pending writes to disk.
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Next value of the named sequence, starting at 1.
    fn next_id(&self, sequence: &str) -> Result<u64, StorageError> {
        let updated = self.sequences.update_and_fetch(sequence, |old| {
            let current = old.and_then(decode_id).unwrap_or(0);
            Some(current.saturating_add(1).to_be_bytes().to_vec())
        })?;
        updated
            .as_deref()
            .and_then(decode_id)
            .ok_or_else(|| StorageError::Database(format!("Sequence '{}' is corrupt", sequence)))
    }
}

fn decode_id(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, id: u64) -> Result<Option<T>, StorageError> {
    tree.get(id.to_be_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, StorageError> {
    tree.iter()
        .values()
        .map(|value| decode(&value?))
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl ViolationStore for SledStore {
    async fn insert_violation(&self, violation: &NewViolation) -> Result<ViolationRecord, StorageError> {
        let id = self.next_id(VIOLATIONS)?;
        let record = ViolationRecord::from_new(id, violation);
        self.violations.insert(id.to_be_bytes(), encode(&record)?)?;
        debug!("Stored violation {} for {}", id, record.camera_location);
        Ok(record)
    }

    async fn list_violations(&self) -> Result<Vec<ViolationRecord>, StorageError> {
        let mut records: Vec<ViolationRecord> = scan(&self.violations)?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl UserStore for SledStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let email = normalize_email(&user.email);
        let id = self.next_id(USERS)?;

        // Claim the e-mail first so concurrent registrations cannot both win.
        let claimed = self.user_emails.compare_and_swap(
            email.as_bytes(),
            None as Option<&[u8]>,
            Some(id.to_be_bytes().to_vec()),
        )?;
        if claimed.is_err() {
            return Err(StorageError::AlreadyExists(format!("User {}", email)));
        }

        let user = User {
            id,
            email,
            password_hash: user.password_hash,
            role: user.role,
        };
        self.users.insert(id.to_be_bytes(), encode(&user)?)?;
        info!("Registered user {} as {}", user.email, user.role);
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = normalize_email(email);
        match self.user_emails.get(email.as_bytes())? {
            Some(id) => match decode_id(&id) {
                Some(id) => get(&self.users, id),
                None => Err(StorageError::Database(format!("Corrupt index entry for {}", email))),
            },
            None => Ok(None),
        }
    }

    async fn get_user(&self, id: u64) -> Result<Option<User>, StorageError> {
        get(&self.users, id)
    }
}

#[async_trait]
impl WorkerStore for SledStore {
    async fn create_worker(&self, fields: WorkerFields) -> Result<Worker, StorageError> {
        let id = self.next_id(WORKERS)?;
        let worker = Worker { id, fields };
        self.workers.insert(id.to_be_bytes(), encode(&worker)?)?;
        Ok(worker)
    }

    async fn list_workers(&self) -> Result<Vec<Worker>, StorageError> {
        scan(&self.workers)
    }

    async fn get_worker(&self, id: u64) -> Result<Option<Worker>, StorageError> {
        get(&self.workers, id)
    }

    async fn update_worker(&self, id: u64, fields: WorkerFields) -> Result<Option<Worker>, StorageError> {
        let worker = Worker { id, fields };
        let encoded = encode(&worker)?;
        let mut found = false;
        self.workers.fetch_and_update(id.to_be_bytes(), |old| {
            found = old.is_some();
            old.map(|_| encoded.clone())
        })?;
        Ok(found.then_some(worker))
    }

    async fn delete_worker(&self, id: u64) -> Result<bool, StorageError> {
        Ok(self.workers.remove(id.to_be_bytes())?.is_some())
    }
}
