use async_trait::async_trait;
use confsync::{DeleteOutcome, ParameterStore, RemoteParameter, SyncError, SyncResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory stand-in for the SSM parameter store.
///
/// Mirrors the store semantics the reconciliation engine relies on:
/// path reads return children of the queried root (never the root name
/// itself), batch deletes report absent names as unresolved rather than
/// failing, and single deletes tolerate missing names. Failures can be
/// scripted per name to exercise error paths.
pub struct InMemoryStore {
    state: Mutex<StoreState>
}

#[derive(Default)]
struct StoreState {
    parameters: BTreeMap<String, ParameterRecord>,
    counters: CallCounters,
    fail_put_on: Option<String>,
    unresolved: Vec<String>
}

struct ParameterRecord {
    value: String,
    version: i64
}

/// How many times each store operation was invoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallCounters {
    pub puts: u32,
    pub lists: u32,
    pub bulk_deletes: u32,
    pub single_deletes: u32
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default())
        }
    }

    pub fn with_parameters(parameters: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (name, value) in parameters {
            store.seed(name, value);
        }
        store
    }

    pub fn seed(&self, name: &str, value: &str) {
        self.state().parameters.insert(
            name.to_string(),
            ParameterRecord {
                value: value.to_string(),
                version: 1
            }
        );
    }

    /// The next put of `name` fails with a write error.
    pub fn fail_put_on(&self, name: &str) {
        self.state().fail_put_on = Some(name.to_string());
    }

    /// Batch deletes report `name` as unresolved even when it exists.
    pub fn mark_unresolved(&self, name: &str) {
        self.state().unresolved.push(name.to_string());
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state()
            .parameters
            .iter()
            .map(|(name, record)| (name.clone(), record.value.clone()))
            .collect()
    }

    pub fn counters(&self) -> CallCounters {
        self.state().counters
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store mutex poisoned")
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for InMemoryStore {
    async fn put(&self, name: &str, value: &str) -> SyncResult<i64> {
        let mut state = self.state();
        state.counters.puts += 1;

        if state.fail_put_on.as_deref() == Some(name) {
            state.fail_put_on = None;
            return Err(SyncError::StoreWrite {
                name: name.to_string(),
                reason: "injected write failure".to_string()
            });
        }

        let version = match state.parameters.get(name) {
            Some(record) => record.version + 1,
            None => 1
        };
        state.parameters.insert(
            name.to_string(),
            ParameterRecord {
                value: value.to_string(),
                version
            }
        );
        Ok(version)
    }

    async fn get_by_path(&self, root: &str) -> SyncResult<Vec<RemoteParameter>> {
        let mut state = self.state();
        state.counters.lists += 1;

        let prefix = format!("{root}/");
        Ok(state
            .parameters
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, record)| RemoteParameter {
                name: name.clone(),
                value: record.value.clone()
            })
            .collect())
    }

    async fn delete_many(&self, names: &[String]) -> SyncResult<DeleteOutcome> {
        let mut state = self.state();
        state.counters.bulk_deletes += 1;

        let mut outcome = DeleteOutcome::default();
        for name in names {
            if state.unresolved.contains(name) || state.parameters.remove(name).is_none() {
                outcome.unresolved.push(name.clone());
            } else {
                outcome.deleted.push(name.clone());
            }
        }
        Ok(outcome)
    }

    async fn delete(&self, name: &str) -> SyncResult<bool> {
        let mut state = self.state();
        state.counters.single_deletes += 1;
        Ok(state.parameters.remove(name).is_some())
    }
}
