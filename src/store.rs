//! Durable named-slot storage and the session snapshot projection.
//!
//! Session state survives process death as a fixed set of named string slots
//! in a JSON file under the data directory. Foreground code writes the
//! `session.*`/`daily.*` slots; the background wake task writes only the
//! liveness stamp. The two writers share the file lock but touch disjoint
//! slots, so neither can lose the other's update.

use crate::common::get_data_dir;
use crate::error::{Result, TrackerError};
use crate::retry::{retry_with_backoff, RetryConfig};
use chrono::NaiveDate;
use fs2::FileExt;
use log::warn;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Names of the persisted slots.
pub mod slots {
    /// Epoch milliseconds, or absent while the clock is not running.
    pub const SESSION_STARTED_AT_WALL_CLOCK: &str = "session.startedAtWallClock";
    pub const SESSION_ACCUMULATED_SECONDS: &str = "session.accumulatedSeconds";
    pub const SESSION_IS_ACTIVE: &str = "session.isActive";
    pub const SESSION_STEPS: &str = "session.steps";
    pub const DAILY_STEPS: &str = "daily.steps";
    pub const DAILY_SECONDS: &str = "daily.seconds";
    pub const DAILY_DATE: &str = "daily.date";
    /// Epoch milliseconds, written by the background wake task only.
    pub const LAST_BACKGROUND_LIVENESS_STAMP: &str = "lastBackgroundLivenessStamp";
}

/// Durable key/value storage for the snapshot slots.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Applies a batch of puts and removes as one durable update.
    fn apply(&self, puts: &[(&str, String)], removes: &[&str]) -> Result<()>;

    fn put(&self, key: &str, value: String) -> Result<()> {
        self.apply(&[(key, value)], &[])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.apply(&[], &[key])
    }
}

/// Slot storage backed by a JSON file, safe against concurrent writers via
/// an exclusive file lock (the background wake task may run as a separate
/// invocation of the process).
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }

    /// The store at the default location under the XDG data directory.
    pub fn open_default(file_name: &str) -> Result<Self> {
        let dir = get_data_dir();
        fs::create_dir_all(&dir)?;
        Ok(FileStore::new(dir.join(file_name)))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_locked_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = OpenOptions::new().read(true).open(&self.path)?;
        file.lock_shared()
            .map_err(|e| TrackerError::lock(e.to_string()))?;
        let mut contents = String::new();
        (&file).read_to_string(&mut contents)?;
        // Lock released when file is dropped
        Ok(Self::parse_slots(&contents, &self.path))
    }

    fn parse_slots(contents: &str, path: &PathBuf) -> BTreeMap<String, String> {
        if contents.trim().is_empty() {
            return BTreeMap::new();
        }
        match serde_json::from_str(contents) {
            Ok(map) => map,
            Err(e) => {
                warn!("slot file corrupted: {}. Backing up and starting fresh.", e);
                let backup = path.with_extension("backup");
                if let Err(copy_err) = fs::copy(path, &backup) {
                    warn!("failed to back up corrupted slot file: {}", copy_err);
                } else {
                    warn!("corrupted slot file backed up to {:?}", backup);
                }
                BTreeMap::new()
            }
        }
    }

    fn apply_once(&self, puts: &[(&str, String)], removes: &[&str]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;
        file.lock_exclusive()
            .map_err(|e| TrackerError::lock(e.to_string()))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut map = Self::parse_slots(&contents, &self.path);

        for (key, value) in puts {
            map.insert((*key).to_string(), value.clone());
        }
        for key in removes {
            map.remove(*key);
        }

        // Truncate and rewrite under the lock
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        let json = serde_json::to_string_pretty(&map)?;
        file.write_all(json.as_bytes())?;

        // Lock released when file is dropped
        Ok(())
    }
}

impl SlotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_locked_map()?.get(key).cloned())
    }

    fn apply(&self, puts: &[(&str, String)], removes: &[&str]) -> Result<()> {
        let retry = RetryConfig::for_file_ops();
        retry_with_backoff(&retry, || self.apply_once(puts, removes))
    }
}

/// In-memory slot storage for tests and the replay binary.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, to exercise degraded persistence.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// A copy of the current slot contents.
    pub fn dump(&self) -> BTreeMap<String, String> {
        self.map.lock().expect("slot map poisoned").clone()
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().expect("slot map poisoned").get(key).cloned())
    }

    fn apply(&self, puts: &[(&str, String)], removes: &[&str]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrackerError::persistence("simulated write failure"));
        }
        let mut map = self.map.lock().expect("slot map poisoned");
        for (key, value) in puts {
            map.insert((*key).to_string(), value.clone());
        }
        for key in removes {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Durable projection of the session and daily-aggregate state.
///
/// Written periodically and on every backgrounding transition; read once at
/// process start. The persisted `daily.*` values hold only the completed
/// portion of the day - the live session's counters live under `session.*`
/// and are recombined after restore, so the two groups are always mutually
/// consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSnapshot {
    pub started_at_wall_clock: Option<i64>,
    pub accumulated_seconds: u64,
    pub is_active: bool,
    pub session_steps: u64,
    pub daily_steps: u64,
    pub daily_seconds: u64,
    pub daily_date: Option<NaiveDate>,
}

impl PersistedSnapshot {
    /// Reads the snapshot, or `None` when no session has ever been persisted.
    pub fn load(store: &dyn SlotStore) -> Result<Option<Self>> {
        let is_active = store.get(slots::SESSION_IS_ACTIVE)?;
        let daily_date = store.get(slots::DAILY_DATE)?;
        if is_active.is_none() && daily_date.is_none() {
            return Ok(None);
        }

        Ok(Some(PersistedSnapshot {
            started_at_wall_clock: parse_slot(
                store.get(slots::SESSION_STARTED_AT_WALL_CLOCK)?,
                slots::SESSION_STARTED_AT_WALL_CLOCK,
            ),
            accumulated_seconds: parse_slot(
                store.get(slots::SESSION_ACCUMULATED_SECONDS)?,
                slots::SESSION_ACCUMULATED_SECONDS,
            )
            .unwrap_or(0),
            is_active: is_active.as_deref() == Some("true"),
            session_steps: parse_slot(store.get(slots::SESSION_STEPS)?, slots::SESSION_STEPS)
                .unwrap_or(0),
            daily_steps: parse_slot(store.get(slots::DAILY_STEPS)?, slots::DAILY_STEPS)
                .unwrap_or(0),
            daily_seconds: parse_slot(store.get(slots::DAILY_SECONDS)?, slots::DAILY_SECONDS)
                .unwrap_or(0),
            daily_date: daily_date
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        }))
    }

    /// Writes every session/daily slot as one batch. The liveness stamp is
    /// not touched; that slot belongs to the background task.
    pub fn save(&self, store: &dyn SlotStore) -> Result<()> {
        let mut puts: Vec<(&str, String)> = vec![
            (
                slots::SESSION_ACCUMULATED_SECONDS,
                self.accumulated_seconds.to_string(),
            ),
            (slots::SESSION_IS_ACTIVE, self.is_active.to_string()),
            (slots::SESSION_STEPS, self.session_steps.to_string()),
            (slots::DAILY_STEPS, self.daily_steps.to_string()),
            (slots::DAILY_SECONDS, self.daily_seconds.to_string()),
        ];
        if let Some(date) = self.daily_date {
            puts.push((slots::DAILY_DATE, date.format("%Y-%m-%d").to_string()));
        }

        let mut removes: Vec<&str> = Vec::new();
        match self.started_at_wall_clock {
            Some(ms) => puts.push((slots::SESSION_STARTED_AT_WALL_CLOCK, ms.to_string())),
            None => removes.push(slots::SESSION_STARTED_AT_WALL_CLOCK),
        }

        store.apply(&puts, &removes)
    }

    /// Writes only the daily slots, for callers that just cleared the
    /// session slots and must not resurrect them.
    pub fn save_daily(&self, store: &dyn SlotStore) -> Result<()> {
        let mut puts: Vec<(&str, String)> = vec![
            (slots::DAILY_STEPS, self.daily_steps.to_string()),
            (slots::DAILY_SECONDS, self.daily_seconds.to_string()),
        ];
        if let Some(date) = self.daily_date {
            puts.push((slots::DAILY_DATE, date.format("%Y-%m-%d").to_string()));
        }
        store.apply(&puts, &[])
    }

    /// Removes the session slots, leaving the daily aggregate in place.
    pub fn clear_session(store: &dyn SlotStore) -> Result<()> {
        store.apply(
            &[],
            &[
                slots::SESSION_STARTED_AT_WALL_CLOCK,
                slots::SESSION_ACCUMULATED_SECONDS,
                slots::SESSION_IS_ACTIVE,
                slots::SESSION_STEPS,
            ],
        )
    }
}

fn parse_slot<T: std::str::FromStr>(value: Option<String>, key: &str) -> Option<T> {
    let raw = value?;
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring unparseable slot {}={:?}", key, raw);
            None
        }
    }
}

/// Writes the background liveness stamp, and nothing else.
///
/// The stamp only ever moves forward, so a wake firing concurrently with a
/// foreground resume cannot drag it backwards.
pub fn write_liveness_stamp(store: &dyn SlotStore, now_ms: i64) -> Result<()> {
    let previous: Option<i64> = parse_slot(
        store.get(slots::LAST_BACKGROUND_LIVENESS_STAMP)?,
        slots::LAST_BACKGROUND_LIVENESS_STAMP,
    );
    let stamp = previous.map_or(now_ms, |p| p.max(now_ms));
    store.put(slots::LAST_BACKGROUND_LIVENESS_STAMP, stamp.to_string())
}

/// Reads the background liveness stamp, if one was ever written.
pub fn read_liveness_stamp(store: &dyn SlotStore) -> Result<Option<i64>> {
    Ok(parse_slot(
        store.get(slots::LAST_BACKGROUND_LIVENESS_STAMP)?,
        slots::LAST_BACKGROUND_LIVENESS_STAMP,
    ))
}
