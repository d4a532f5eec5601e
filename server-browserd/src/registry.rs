use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use shared::types::{Registration, ServerRecord, ServerUpdate};
use crate::error::{StoreError, StoreResult};
use crate::secured::{Secret, SecuredResource};

type Entries = HashMap<Uuid, SecuredResource<ServerRecord>>;

/// Everything needed to create a record except the parts the registry assigns
/// itself (id and heartbeat clock).
#[derive(Debug, Clone)]
pub struct ServerDraft {
    pub source_address: IpAddr,
    pub verified: bool,
    pub registration: Registration,
}

impl ServerDraft {
    fn into_record(self, id: Uuid, now: DateTime<Utc>) -> ServerRecord {
        let registration = self.registration;
        ServerRecord {
            id,
            source_address: self.source_address,
            local_address: registration.local_ip_address,
            ports: registration.ports,
            password_protected: registration.password_protected,
            last_heartbeat: now,
            name: registration.name,
            description: registration.description,
            current_map: registration.current_map,
            player_count: registration.player_count,
            max_players: registration.max_players,
            verified: self.verified,
            mods: registration.mods,
        }
    }
}

/// In-memory map of registered servers keyed by their id.
///
/// Each entry is a [`SecuredResource`]: anyone can list it, only the holder of
/// the secret handed out by [`ServerRegistry::register`] can change or delete
/// it. Entries whose heartbeat is older than the timeout are evicted lazily
/// whenever they are looked at, and in bulk by [`ServerRegistry::get_all`].
pub struct ServerRegistry {
    entries: Mutex<Entries>,
    heartbeat_timeout: Duration,
}

impl ServerRegistry {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            heartbeat_timeout,
        }
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Deadline by which `record` must heartbeat again. Saturates at the
    /// latest representable time.
    pub fn refresh_before(&self, record: &ServerRecord) -> DateTime<Utc> {
        record
            .last_heartbeat
            .checked_add_signed(self.heartbeat_timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Registers a new server. The returned secret is the only proof of
    /// ownership and cannot be recovered later.
    pub fn register(&self, draft: ServerDraft) -> (Uuid, Secret, ServerRecord) {
        let id = Uuid::new_v4();
        let secret = Secret::generate();
        let record = draft.into_record(id, Utc::now());

        self.lock()
            .insert(id, SecuredResource::new(secret.clone(), record.clone()));

        (id, secret, record)
    }

    pub fn exists(&self, id: Uuid) -> bool {
        let mut entries = self.lock();
        self.evict_if_expired(&mut entries, id, Utc::now());
        entries.contains_key(&id)
    }

    /// Unauthenticated read of a single server
    pub fn get(&self, id: Uuid) -> Option<ServerRecord> {
        let mut entries = self.lock();
        self.evict_if_expired(&mut entries, id, Utc::now());
        entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Replaces the record for `id` with `transform(current)` if `secret` owns it.
    /// The id is kept whatever the transform returns.
    pub fn update<F>(&self, id: Uuid, secret: &str, transform: F) -> StoreResult<ServerRecord>
    where
        F: FnOnce(ServerRecord) -> ServerRecord,
    {
        let mut entries = self.lock();
        self.evict_if_expired(&mut entries, id, Utc::now());

        let current = entries.get(&id).ok_or(StoreError::NotFound)?;
        let next = transform(current.value().clone());
        let replacement = current
            .with_value(secret, ServerRecord { id, ..next })
            .ok_or(StoreError::Forbidden)?;

        let record = replacement.value().clone();
        entries.insert(id, replacement);
        Ok(record)
    }

    /// Refreshes the liveness clock
    pub fn heartbeat(&self, id: Uuid, secret: &str) -> StoreResult<ServerRecord> {
        let now = Utc::now();
        self.update(id, secret, |record| record.with_heartbeat(now))
    }

    /// Applies new game state. Does not count as a heartbeat.
    pub fn apply_update(&self, id: Uuid, secret: &str, update: &ServerUpdate) -> StoreResult<ServerRecord> {
        self.update(id, secret, |record| record.with_update(update))
    }

    pub fn delete(&self, id: Uuid, secret: &str) -> StoreResult<ServerRecord> {
        let mut entries = self.lock();
        self.evict_if_expired(&mut entries, id, Utc::now());

        let entry = entries.get(&id).ok_or(StoreError::NotFound)?;
        if !entry.validate(secret) {
            return Err(StoreError::Forbidden);
        }

        entries
            .remove(&id)
            .map(SecuredResource::into_value)
            .ok_or(StoreError::NotFound)
    }

    /// Evicts timed out servers, then returns everything still alive.
    pub fn get_all(&self) -> Vec<ServerRecord> {
        let mut entries = self.lock();
        self.sweep(&mut entries, Utc::now());
        entries.values().map(|entry| entry.value().clone()).collect()
    }

    /// Removes every server whose heartbeat is older than the timeout at `now`.
    /// Returns how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        self.sweep(&mut entries, now)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // A deadline past the end of representable time never expires.
    fn is_expired(&self, record: &ServerRecord, now: DateTime<Utc>) -> bool {
        record
            .last_heartbeat
            .checked_add_signed(self.heartbeat_timeout)
            .is_some_and(|deadline| deadline < now)
    }

    fn sweep(&self, entries: &mut Entries, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|id, entry| {
            let expired = self.is_expired(entry.value(), now);
            if expired {
                tracing::info!(
                    "Server \"{}\" ({}) timed out, last heartbeat {}",
                    entry.value().name,
                    id,
                    entry.value().last_heartbeat
                );
            }
            !expired
        });
        before - entries.len()
    }

    fn evict_if_expired(&self, entries: &mut Entries, id: Uuid, now: DateTime<Utc>) {
        if entries
            .get(&id)
            .is_some_and(|entry| self.is_expired(entry.value(), now))
        {
            entries.remove(&id);
            tracing::info!("Server {} timed out", id);
        }
    }

    // Entries are only ever replaced wholesale, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
