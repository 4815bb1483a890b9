//! Durable order log: whole-state snapshot, loaded once at startup and
//! overwritten after every mutation. Saves are serialized by an internal
//! lock.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::order::Order;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalState {
    pub sequence: u64,
    pub orders: Vec<Order>,
}

pub trait OrderJournal: Send + Sync {
    /// `None` when no snapshot exists yet (first start).
    fn load(&self) -> Result<Option<JournalState>, AppError>;
    fn save(&self, state: &JournalState) -> Result<(), AppError>;
}

/// Production journal: pretty-printed JSON at a configured path.
pub struct JsonJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl OrderJournal for JsonJournal {
    fn load(&self) -> Result<Option<JournalState>, AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|err| err.into_inner());

        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path).map_err(|err| {
            AppError::Internal(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let state = serde_json::from_str(&raw).map_err(|err| {
            AppError::Internal(format!("corrupt journal {}: {err}", self.path.display()))
        })?;

        Ok(Some(state))
    }

    fn save(&self, state: &JournalState) -> Result<(), AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|err| err.into_inner());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::Internal(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let raw = serde_json::to_string_pretty(state)
            .map_err(|err| AppError::Internal(format!("failed to serialize journal: {err}")))?;
        fs::write(&self.path, raw).map_err(|err| {
            AppError::Internal(format!("failed to write {}: {err}", self.path.display()))
        })
    }
}

/// Test journal keeping the snapshot in memory.
#[derive(Default)]
pub struct MemoryJournal {
    state: Mutex<Option<JournalState>>,
}

impl OrderJournal for MemoryJournal {
    fn load(&self) -> Result<Option<JournalState>, AppError> {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        Ok(state.clone())
    }

    fn save(&self, state: &JournalState) -> Result<(), AppError> {
        let mut slot = self.state.lock().unwrap_or_else(|err| err.into_inner());
        *slot = Some(state.clone());
        Ok(())
    }
}
