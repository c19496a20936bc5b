//! Per-key locked state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A map of independently locked values, one per server.
///
/// Mutations run under the shared map lock plus the slot's own mutex, so two
/// servers never contend and a slot can only be dropped while nobody is
/// inside it.
#[derive(Debug)]
pub struct Keyed<T> {
    slots: RwLock<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Default> Keyed<T> {
    /// Runs `f` with exclusive access to the value for `key`, creating an
    /// empty value on first use.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> R {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(key) {
                let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
                return f(&mut value);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.to_string()).or_default();
        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut value)
    }
}

impl<T> Keyed<T> {
    /// Like [`Keyed::with`] but never creates a slot.
    pub fn with_existing<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(key)?;
        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut value))
    }

    /// Returns the slot for `key` if one exists.
    pub fn get(&self, key: &str) -> Option<Arc<Mutex<T>>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    /// Drops the slot for `key`.
    pub fn remove(&self, key: &str) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
    }

    /// Drops the slot for `key` when `pred` holds for its value.
    pub fn remove_if(&self, key: &str, pred: impl FnOnce(&T) -> bool) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let matches = slots
            .get(key)
            .is_some_and(|slot| pred(&*slot.lock().unwrap_or_else(PoisonError::into_inner)));
        if matches {
            slots.remove(key);
        }
        matches
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
