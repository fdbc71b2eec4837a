/*!
 * Object Registry
 *
 * Maps external object keys to their published condition variables, so code
 * holding only an object identity can notify or wait on it.
 *
 * # Locking
 *
 * The registry lock is taken before a variable's entry lock and never the
 * other way around. `lookup_and_lock` acquires the variable's lock while the
 * registry lock is still held, so an unpublish cannot slip in between.
 */

use super::dump::VariableSnapshot;
use super::variable::{EntryList, VariableCore};
use crate::core::errors::{CondvarError, CondvarResult};
use crate::core::types::ObjectKey;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

struct Published {
    variable: Arc<VariableCore>,
    sequence: u64,
}

struct RegistryState {
    variables: HashMap<ObjectKey, Published, ahash::RandomState>,
    /// Traversal list in publish order
    order: BTreeMap<u64, ObjectKey>,
    next_sequence: u64,
}

pub(crate) struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                variables: HashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
                order: BTreeMap::new(),
                next_sequence: 0,
            }),
        }
    }

    pub(crate) fn publish(
        &self,
        object: ObjectKey,
        variable: &Arc<VariableCore>,
        object_type: &'static str,
    ) -> CondvarResult<()> {
        if object.is_null() {
            return Err(CondvarError::NullObject);
        }

        let mut state = self.state.lock();
        if let Some(existing) = state.variables.get(&object) {
            return Err(if Arc::ptr_eq(&existing.variable, variable) {
                CondvarError::AlreadyPublished(object)
            } else {
                CondvarError::KeyInUse(object)
            });
        }

        variable
            .mark_published(object, object_type)
            .map_err(CondvarError::AlreadyPublished)?;

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.variables.insert(
            object,
            Published {
                variable: variable.clone(),
                sequence,
            },
        );
        state.order.insert(sequence, object);
        Ok(())
    }

    /// Remove `variable`'s mapping; `None` if it was not published
    pub(crate) fn unpublish(&self, variable: &Arc<VariableCore>) -> Option<ObjectKey> {
        let mut state = self.state.lock();
        let object = variable.take_published()?;

        let sequence = state
            .variables
            .get(&object)
            .filter(|published| Arc::ptr_eq(&published.variable, variable))
            .map(|published| published.sequence);
        if let Some(sequence) = sequence {
            state.variables.remove(&object);
            state.order.remove(&sequence);
        }
        Some(object)
    }

    /// Run `f` with the variable published under `object` and its entry lock
    /// held; `None` if nothing is published there
    pub(crate) fn lookup_and_lock<R>(
        &self,
        object: ObjectKey,
        f: impl FnOnce(&Arc<VariableCore>, &mut EntryList) -> R,
    ) -> Option<R> {
        let state = self.state.lock();
        let variable = state.variables.get(&object)?.variable.clone();
        let mut entries = variable.lock_entries();
        drop(state);
        Some(f(&variable, &mut entries))
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().variables.len()
    }

    pub(crate) fn cursor(&self, entry_limit: usize) -> RegistryCursor<'_> {
        RegistryCursor {
            registry: self,
            position: None,
            entry_limit,
            stalled: false,
        }
    }
}

/// Lazy traversal of every published variable
///
/// Each step takes the registry lock without blocking and resumes after the
/// last variable it produced, so the cursor tolerates concurrent publishes and
/// unpublishes. If the lock is busy the step yields `None` and marks the
/// cursor stalled; calling `next` again retries from the same position.
pub struct RegistryCursor<'a> {
    registry: &'a Registry,
    position: Option<u64>,
    entry_limit: usize,
    stalled: bool,
}

impl RegistryCursor<'_> {
    /// Whether the last step ended early because the registry was busy
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Restart the traversal from the first published variable
    pub fn rewind(&mut self) {
        self.position = None;
        self.stalled = false;
    }
}

impl Iterator for RegistryCursor<'_> {
    type Item = VariableSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(state) = self.registry.state.try_lock() else {
            self.stalled = true;
            return None;
        };
        self.stalled = false;

        let lower = match self.position {
            Some(position) => Bound::Excluded(position),
            None => Bound::Unbounded,
        };
        let (&sequence, object) = state.order.range((lower, Bound::Unbounded)).next()?;
        let variable = state.variables.get(object)?.variable.clone();
        drop(state);

        self.position = Some(sequence);
        Some(VariableSnapshot::capture(&variable, self.entry_limit))
    }
}
