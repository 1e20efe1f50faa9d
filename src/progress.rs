//! Per-exercise progress kept in a [`KeyValueStore`].

use serde::{Deserialize, Serialize};

use crate::normalize::{ExerciseRecord, Load};
use crate::storage::KeyValueStore;

/// Prefix shared by every key this application writes.
pub const KEY_PREFIX: &str = "FlavinShape_";

/// Stable storage key for one exercise of one plan/day.
///
/// The triple is encoded as a JSON array behind [`KEY_PREFIX`], so free text
/// containing any delimiter cannot make two triples share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExerciseIdentity(String);

impl ExerciseIdentity {
    pub fn new(plan: &str, workout_day: &str, exercise_name: &str) -> Self {
        let triple = serde_json::Value::from(vec![plan, workout_day, exercise_name]);
        Self(format!("{KEY_PREFIX}{triple}"))
    }

    pub fn of(record: &ExerciseRecord) -> Self {
        Self::new(&record.plan, &record.workout_day, &record.exercise_name)
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExerciseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored user state for an exercise. `None` fields fall back to the sheet.
///
/// Also used as a partial update for [`ProgressStore::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default, alias = "carga", skip_serializing_if = "Option::is_none")]
    pub load: Option<Load>,
    #[serde(default, alias = "concluido", skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl ProgressRecord {
    pub fn with_load(load: Load) -> Self {
        Self {
            load: Some(load),
            completed: None,
        }
    }

    pub fn with_completed(completed: bool) -> Self {
        Self {
            load: None,
            completed: Some(completed),
        }
    }

    /// Overlay every field set in `patch`, keeping the rest.
    pub fn merged(mut self, patch: ProgressRecord) -> Self {
        if patch.load.is_some() {
            self.load = patch.load;
        }
        if patch.completed.is_some() {
            self.completed = patch.completed;
        }
        self
    }
}

pub struct ProgressStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the record for `id`; missing or unreadable data yields `None`.
    pub fn get(&self, id: &ExerciseIdentity) -> Option<ProgressRecord> {
        let raw = self.store.get(id.key())?;
        match serde_json::from_str::<ProgressRecord>(&raw) {
            Ok(rec) => Some(rec),
            Err(e) => {
                log::warn!("Treating corrupt progress for {id} as absent: {e}");
                None
            }
        }
    }

    /// Read the current record (or an empty one), overlay `patch`, write back.
    pub fn merge(&mut self, id: &ExerciseIdentity, patch: ProgressRecord) -> ProgressRecord {
        let merged = self.get(id).unwrap_or_default().merged(patch);
        match serde_json::to_string(&merged) {
            Ok(json) => {
                log::debug!("Saving progress {id}: {json}");
                self.store.set(id.key(), json);
            }
            Err(e) => log::error!("Failed to serialize progress for {id}: {e}"),
        }
        merged
    }

    /// Remove every key carrying [`KEY_PREFIX`]. Returns how many went.
    pub fn clear_all(&mut self) -> usize {
        let keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(KEY_PREFIX))
            .collect();
        self.store.remove_many(&keys);
        log::info!("Cleared {} progress entries", keys.len());
        keys.len()
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.store
    }
}
