//! In-memory store used by tests and single-process development mode.
//!
//! Entries are kept behind an outer read lock with one mutex per user, so
//! concurrent requests for unrelated users never serialize on each other.
//! Critical sections are short and never held across an await.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use uuid::Uuid;

use super::store::{
    Credentials, DeviceRecord, DeviceStore, NewUser, RevocationStore, StoreError, User, UserStore,
};

/// Device history kept per user; the least recently seen record is dropped
/// once the cap is reached.
const DEVICE_HISTORY_CAP: usize = 20;

struct UserEntry {
    user: User,
    password_hash: String,
    /// token -> the token's own expiry; entries past it are pruned.
    revoked: HashMap<String, DateTime<Utc>>,
    devices: Vec<DeviceRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, Arc<Mutex<UserEntry>>>>,
    emails: RwLock<HashMap<String, Uuid>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Option<Arc<Mutex<UserEntry>>> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.entry(id).map(|entry| lock(&entry).user.clone()))
    }

    async fn lookup_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let id = self
            .emails
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .copied();
        Ok(id.and_then(|id| self.entry(id)).map(|entry| {
            let entry = lock(&entry);
            Credentials {
                user: entry.user.clone(),
                password_hash: entry.password_hash.clone(),
            }
        }))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut emails = self.emails.write().unwrap_or_else(PoisonError::into_inner);
        if emails.contains_key(&user.email) {
            return Err(StoreError(anyhow::anyhow!(
                "email already registered: {}",
                user.email
            )));
        }

        let record = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            name: user.name,
            is_admin: user.is_admin,
            is_blocked: false,
        };
        emails.insert(user.email, record.id);
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                record.id,
                Arc::new(Mutex::new(UserEntry {
                    user: record.clone(),
                    password_hash: user.password_hash,
                    revoked: HashMap::new(),
                    devices: Vec::new(),
                })),
            );
        Ok(record)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let entries: Vec<Arc<Mutex<UserEntry>>> = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut users: Vec<User> = entries
            .iter()
            .map(|entry| lock(entry).user.clone())
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<Option<User>, StoreError> {
        Ok(self.entry(id).map(|entry| {
            let mut entry = lock(&entry);
            entry.user.is_blocked = blocked;
            entry.user.clone()
        }))
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<User>, StoreError> {
        Ok(self.entry(id).map(|entry| {
            let mut entry = lock(&entry);
            entry.user.is_admin = is_admin;
            entry.user.clone()
        }))
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn revoke(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(entry) = self.entry(user_id) {
            let mut entry = lock(&entry);
            let now = Utc::now();
            entry.revoked.retain(|_, expiry| *expiry > now);
            entry.revoked.insert(token.to_string(), expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        Ok(self
            .entry(user_id)
            .is_some_and(|entry| lock(&entry).revoked.contains_key(token)))
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn upsert_device(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let Some(entry) = self.entry(user_id) else {
            return Err(StoreError(anyhow::anyhow!("unknown user: {user_id}")));
        };
        let mut entry = lock(&entry);

        if let Some(device) = entry
            .devices
            .iter_mut()
            .find(|device| device.user_agent == user_agent && device.ip_address == ip_address)
        {
            // Last writer wins by timestamp.
            if seen_at > device.last_seen_at {
                device.last_seen_at = seen_at;
            }
            return Ok(());
        }

        entry.devices.push(DeviceRecord {
            user_agent: user_agent.to_string(),
            ip_address: ip_address.to_string(),
            last_seen_at: seen_at,
        });
        while entry.devices.len() > DEVICE_HISTORY_CAP {
            if let Some(oldest) = entry
                .devices
                .iter()
                .enumerate()
                .min_by_key(|(_, device)| device.last_seen_at)
                .map(|(index, _)| index)
            {
                entry.devices.remove(oldest);
            }
        }
        Ok(())
    }

    async fn list_devices(&self, user_id: Uuid) -> Result<Vec<DeviceRecord>, StoreError> {
        let mut devices = self
            .entry(user_id)
            .map(|entry| lock(&entry).devices.clone())
            .unwrap_or_default();
        devices.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(devices)
    }
}
