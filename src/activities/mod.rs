//! In-memory activity registry.
//!
//! Activities are fixed at startup; only their participant rosters change.
//! Every mutation happens under one lock, so concurrent signups for the same
//! activity cannot interleave. The registry does no authorization: callers
//! check [`crate::policy`] first.

pub mod catalog;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// One extracurricular offering and its current roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub description: String,
    pub schedule: String,
    pub max_participants: u32,
    /// Participant emails in signup order. Never contains duplicates.
    pub participants: Vec<String>,
}

impl Activity {
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Activity not found")]
    NotFound,
    #[error("Student is already signed up")]
    AlreadySignedUp,
    #[error("Student is not signed up for this activity")]
    NotSignedUp,
    #[error("Activity is full")]
    Full,
}

#[derive(Debug)]
pub struct ActivityRegistry {
    activities: Mutex<BTreeMap<String, Activity>>,
    enforce_capacity: bool,
}

impl ActivityRegistry {
    pub fn new(activities: impl IntoIterator<Item = (String, Activity)>) -> Self {
        Self {
            activities: Mutex::new(activities.into_iter().collect()),
            enforce_capacity: false,
        }
    }

    /// Registry seeded with [`catalog::default_catalog`].
    pub fn with_default_catalog() -> Self {
        Self::new(catalog::default_catalog())
    }

    /// Reject signups once `max_participants` is reached.
    #[must_use]
    pub fn enforce_capacity(mut self, enforce: bool) -> Self {
        self.enforce_capacity = enforce;
        self
    }

    /// Point-in-time copy of every activity, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, Activity> {
        self.activities.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<Activity> {
        self.activities.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.activities.lock().contains_key(name)
    }

    pub fn signup(&self, name: &str, email: &str) -> Result<(), RegistryError> {
        let mut activities = self.activities.lock();
        let activity = activities.get_mut(name).ok_or(RegistryError::NotFound)?;
        if activity.participants.iter().any(|p| p == email) {
            return Err(RegistryError::AlreadySignedUp);
        }
        if self.enforce_capacity && activity.is_full() {
            return Err(RegistryError::Full);
        }
        activity.participants.push(email.to_owned());
        Ok(())
    }

    pub fn unregister(&self, name: &str, email: &str) -> Result<(), RegistryError> {
        let mut activities = self.activities.lock();
        let activity = activities.get_mut(name).ok_or(RegistryError::NotFound)?;
        let pos = activity
            .participants
            .iter()
            .position(|p| p == email)
            .ok_or(RegistryError::NotSignedUp)?;
        activity.participants.remove(pos);
        Ok(())
    }
}
