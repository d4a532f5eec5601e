use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use anyhow::{Context, Result};
use crate::acl::range::NetworkRange;
use crate::error::{StoreError, StoreResult};
use crate::secured::{Secret, SecuredResource};

type Ranges = BTreeSet<NetworkRange>;

/// A file-backed set of IP networks, readable by anyone for membership checks
/// and mutable only with the admin secret.
///
/// The file is the durable copy; the in-memory set is a write-through cache of
/// it. Every successful mutation rewrites the whole file while the lock is held.
pub struct NetworkRangeStore {
    label: String,
    path: PathBuf,
    ranges: Mutex<SecuredResource<Ranges>>,
}

impl NetworkRangeStore {
    /// Load the store from `path`. A missing file is an empty store; a file
    /// with any unparseable line is an error.
    pub fn open(label: impl Into<String>, path: impl AsRef<Path>, secret: Secret) -> Result<Self> {
        let label = label.into();
        let path = path.as_ref().to_path_buf();
        let ranges = load_ranges(&path)?;

        tracing::info!("Loaded {} entries into {} from {}", ranges.len(), label, path.display());

        Ok(Self {
            label,
            path,
            ranges: Mutex::new(SecuredResource::new(secret, ranges)),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn validate(&self, secret: &str) -> bool {
        self.lock().validate(secret)
    }

    /// Adds every entry, or none of them if any fails to parse.
    /// Returns the new number of entries.
    pub fn add_all<I, S>(&self, secret: &str, entries: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.mutate(secret, entries, |current, parsed| {
            current.union(parsed).copied().collect()
        })
    }

    /// Removes every entry, or none of them if any fails to parse.
    /// Returns the new number of entries.
    pub fn remove_all<I, S>(&self, secret: &str, entries: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.mutate(secret, entries, |current, parsed| {
            current.difference(parsed).copied().collect()
        })
    }

    pub fn clear(&self, secret: &str) -> StoreResult<()> {
        self.mutate(secret, std::iter::empty::<&str>(), |_, _| Ranges::new())
            .map(|_| ())
    }

    /// True if `ip` is a valid host address inside any stored network.
    pub fn contains(&self, ip: &str) -> bool {
        match ip.trim().parse::<IpAddr>() {
            Ok(ip) => self.contains_addr(ip),
            Err(_) => false,
        }
    }

    pub fn contains_addr(&self, ip: IpAddr) -> bool {
        self.lock().value().iter().any(|range| range.contains(ip))
    }

    pub fn get_all(&self, secret: &str) -> StoreResult<Ranges> {
        let guard = self.lock();
        if !guard.validate(secret) {
            return Err(StoreError::Forbidden);
        }
        Ok(guard.value().clone())
    }

    pub fn len(&self) -> usize {
        self.lock().value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Authorization is checked before parsing so unauthorized callers learn
    // nothing about which of their entries were malformed.
    fn mutate<I, S, F>(&self, secret: &str, entries: I, combine: F) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnOnce(&Ranges, &Ranges) -> Ranges,
    {
        let mut guard = self.lock();
        if !guard.validate(secret) {
            return Err(StoreError::Forbidden);
        }

        let parsed = parse_all(entries)?;
        let next = combine(guard.value(), &parsed);
        *guard = guard.with_value(secret, next).ok_or(StoreError::Forbidden)?;

        self.save(guard.value());
        Ok(guard.value().len())
    }

    fn save(&self, ranges: &Ranges) {
        if let Err(e) = write_ranges(&self.path, ranges) {
            // In-memory state has already moved on; the file catches up on the next save.
            tracing::error!("Failed to save {} to {}: {:#}", self.label, self.path.display(), e);
        }
    }

    // Values are only ever replaced wholesale, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, SecuredResource<Ranges>> {
        self.ranges.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_all<I, S>(entries: I) -> StoreResult<Ranges>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| {
            entry
                .as_ref()
                .parse::<NetworkRange>()
                .map_err(|e| StoreError::InvalidInput(e.to_string()))
        })
        .collect()
}

fn load_ranges(path: &Path) -> Result<Ranges> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Ranges::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let mut ranges = Ranges::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let range = line
            .parse::<NetworkRange>()
            .with_context(|| format!("Invalid entry on line {} of {}", idx + 1, path.display()))?;
        ranges.insert(range);
    }

    Ok(ranges)
}

/// Writes to a sibling temp file and renames it over `path`, so a crash
/// mid-write never leaves a truncated list behind.
fn write_ranges(path: &Path, ranges: &Ranges) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let contents: String = ranges.iter().map(|range| format!("{}\n", range)).collect();

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
