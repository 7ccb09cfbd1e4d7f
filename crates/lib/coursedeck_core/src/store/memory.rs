//! In-memory store backed by `DashMap`.
//!
//! Backs the session-handle mapping in the running server and both
//! store traits in tests. Safe for concurrent access from multiple
//! request tasks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{SessionHandleStore, StoreError, UserStore};
use crate::models::{Identity, NewUser, Role, UserRecord};

/// Opaque handles expire after 7 days, matching the cookie max-age.
const HANDLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct HandleEntry {
    identity_id: String,
    created_at: Instant,
}

/// Concurrent in-memory user + session-handle store.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserRecord>,
    handles: DashMap<String, HandleEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(&email.to_lowercase()).map(|r| r.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|r| r.identity.id == id)
            .map(|r| r.clone()))
    }

    async fn create(&self, user: NewUser) -> Result<Identity, StoreError> {
        let email = user.email.to_lowercase();
        if self.users.contains_key(&email) {
            return Err(StoreError::Duplicate(email));
        }
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            display_name: user.display_name,
            role: user.role,
        };
        self.users.insert(
            email,
            UserRecord {
                identity: identity.clone(),
                password_digest: user.password_digest,
            },
        );
        Ok(identity)
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        for mut entry in self.users.iter_mut() {
            if entry.identity.id == id {
                entry.identity.role = role;
                return Ok(());
            }
        }
        Err(StoreError::Backend(format!("no such user: {id}")))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.users.retain(|_, r| r.identity.id != id);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.len() as u64)
    }
}

#[async_trait]
impl SessionHandleStore for MemoryStore {
    async fn put(&self, handle: &str, identity_id: &str) -> Result<(), StoreError> {
        self.handles.insert(
            handle.to_string(),
            HandleEntry {
                identity_id: identity_id.to_string(),
                created_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, handle: &str) -> Result<Option<String>, StoreError> {
        // Look up and drop the map guard before any removal.
        let live = match self.handles.get(handle) {
            None => return Ok(None),
            Some(entry) => {
                if entry.created_at.elapsed() <= HANDLE_TTL {
                    return Ok(Some(entry.identity_id.clone()));
                }
                false
            }
        };
        if !live {
            self.handles.remove(handle);
        }
        Ok(None)
    }

    async fn delete(&self, handle: &str) -> Result<(), StoreError> {
        self.handles.remove(handle);
        Ok(())
    }
}
