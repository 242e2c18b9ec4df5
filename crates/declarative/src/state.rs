//! Persisted instance state
//!
//! The host records, per instance address, the bound identity and the last
//! observed state. Records are the only thing that survives between passes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Current on-disk format version
const STATE_VERSION: u32 = 1;

/// Stored record of one resource instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Resource type name
    pub resource_type: String,
    /// Bound identity
    pub id: String,
    /// Last observed state, as serialized by the resource
    pub state: Value,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Build a record from a typed state
    pub fn new<S: Serialize>(resource_type: &str, id: &str, state: &S) -> Result<Self> {
        Ok(Self {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            state: serde_json::to_value(state)
                .with_context(|| format!("Failed to serialize state of {resource_type} {id}"))?,
            updated_at: Utc::now(),
        })
    }
}

/// Storage for instance records, keyed by address (e.g. "user_roles.admin")
pub trait StateStore {
    /// Load the record at an address
    fn load(&self, address: &str) -> Result<Option<InstanceRecord>>;

    /// Store a record at an address
    fn save(&mut self, address: &str, record: InstanceRecord) -> Result<()>;

    /// Drop the record at an address, clearing its identity
    fn remove(&mut self, address: &str) -> Result<()>;

    /// Addresses with a stored record
    fn addresses(&self) -> Result<Vec<String>>;
}

/// In-memory store, for tests and one-shot passes
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: BTreeMap<String, InstanceRecord>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, address: &str) -> Result<Option<InstanceRecord>> {
        Ok(self.records.get(address).cloned())
    }

    fn save(&mut self, address: &str, record: InstanceRecord) -> Result<()> {
        self.records.insert(address.to_string(), record);
        Ok(())
    }

    fn remove(&mut self, address: &str) -> Result<()> {
        self.records.remove(address);
        Ok(())
    }

    fn addresses(&self) -> Result<Vec<String>> {
        Ok(self.records.keys().cloned().collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    instances: BTreeMap<String, InstanceRecord>,
    last_updated: DateTime<Utc>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            instances: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

/// JSON file store
///
/// The whole file is read on every load and rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Use the state file at `path` (created on first save)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<StateFile> {
        if !self.path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(StateFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        let file: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))?;

        if file.version != STATE_VERSION {
            anyhow::bail!(
                "Unsupported state file version {} in {} (expected {})",
                file.version,
                self.path.display(),
                STATE_VERSION
            );
        }
        Ok(file)
    }

    fn write_file(&self, mut file: StateFile) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        file.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize state to JSON")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self, address: &str) -> Result<Option<InstanceRecord>> {
        Ok(self.read_file()?.instances.remove(address))
    }

    fn save(&mut self, address: &str, record: InstanceRecord) -> Result<()> {
        let mut file = self.read_file()?;
        file.instances.insert(address.to_string(), record);
        self.write_file(file)
    }

    fn remove(&mut self, address: &str) -> Result<()> {
        let mut file = self.read_file()?;
        if file.instances.remove(address).is_some() {
            self.write_file(file)?;
        }
        Ok(())
    }

    fn addresses(&self) -> Result<Vec<String>> {
        Ok(self.read_file()?.instances.into_keys().collect())
    }
}
