//! Sandbox/production selection.

use std::sync::{Arc, RwLock};

use tracing::info;
use xyno_core::Environment;

use crate::error::StorageError;
use crate::storage::{ENVIRONMENT_KEY, Storage};

/// The environment every API call is scoped to.
///
/// The value is read once from storage when the state is created and written
/// back whenever it changes. Anything other than the stored string
/// `"production"` resolves to sandbox.
pub struct EnvironmentState {
    storage: Arc<dyn Storage>,
    current: RwLock<Environment>,
}

impl EnvironmentState {
    /// Load the persisted selection.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let current = Environment::from_stored(storage.get(ENVIRONMENT_KEY).as_deref());
        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    /// Currently selected environment.
    #[must_use]
    pub fn current(&self) -> Environment {
        self.current.read().map(|env| *env).unwrap_or_default()
    }

    /// Select `environment` and persist it.
    ///
    /// The in-memory value only changes once storage accepted the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection cannot be persisted.
    pub fn set(&self, environment: Environment) -> Result<(), StorageError> {
        let mut current = self.current.write().map_err(|_| StorageError::Poisoned)?;
        self.storage.set(ENVIRONMENT_KEY, environment.as_str())?;
        if *current != environment {
            info!(from = %*current, to = %environment, "Environment switched");
        }
        *current = environment;
        Ok(())
    }

    /// Switch to the other environment, returning the new selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection cannot be persisted.
    pub fn toggle(&self) -> Result<Environment, StorageError> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}

impl std::fmt::Debug for EnvironmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentState")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_defaults_to_sandbox() {
        let state = EnvironmentState::load(Arc::new(MemoryStorage::new()));
        assert_eq!(state.current(), Environment::Sandbox);
    }

    #[test]
    fn test_unknown_stored_value_is_sandbox() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(ENVIRONMENT_KEY, "staging").unwrap();
        assert_eq!(EnvironmentState::load(storage).current(), Environment::Sandbox);
    }

    #[test]
    fn test_set_persists_selection() {
        let storage = Arc::new(MemoryStorage::new());
        let state = EnvironmentState::load(storage.clone());

        state.set(Environment::Production).unwrap();
        assert_eq!(state.current(), Environment::Production);
        assert_eq!(storage.get(ENVIRONMENT_KEY).as_deref(), Some("production"));

        let reloaded = EnvironmentState::load(storage);
        assert_eq!(reloaded.current(), Environment::Production);
        assert_eq!(reloaded.toggle().unwrap(), Environment::Sandbox);
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let state = EnvironmentState::load(Arc::new(ReadOnlyStorage));
        assert!(state.set(Environment::Production).is_err());
        assert_eq!(state.current(), Environment::Sandbox);
    }
}
