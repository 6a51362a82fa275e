use crate::survey::*;

use std::collections::BTreeMap;
use std::fs;

use group_balance::{Group, GroupRegistry};

/// Read/write contract for the persisted group distribution.
///
/// `load` never fails: a store that is missing, unreadable or corrupt falls
/// back to an all-zero registry, since losing the counts must not keep a
/// participant out of the study. `save` overwrites the previous content
/// with the complete mapping.
pub trait RegistryStore {
    fn load(&self, groups: &[Group]) -> GroupRegistry;
    fn save(&mut self, registry: &GroupRegistry) -> SurveyResult<()>;
}

fn zero_registry(groups: &[Group]) -> GroupRegistry {
    // The group set was validated to be non-empty before any store is built.
    GroupRegistry::new(groups).unwrap()
}

/// Durable store: a JSON document mapping group key to count.
pub struct JsonFileStore {
    path: String,
}

impl JsonFileStore {
    pub fn new(path: &str) -> JsonFileStore {
        JsonFileStore {
            path: path.to_string(),
        }
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self, groups: &[Group]) -> GroupRegistry {
        let contents = match fs::read_to_string(&self.path) {
            Result::Ok(c) => c,
            Result::Err(e) => {
                debug!(
                    "load: no readable registry at {} ({}), starting from zero",
                    self.path, e
                );
                return zero_registry(groups);
            }
        };
        let parsed: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&contents) {
            Result::Ok(m) => m,
            Result::Err(e) => {
                warn!(
                    "load: corrupt registry at {} ({}), starting from zero",
                    self.path, e
                );
                return zero_registry(groups);
            }
        };

        let mut pairs: Vec<(String, u32)> = Vec::new();
        for (key, value) in parsed {
            if !groups.iter().any(|g| g.key == key) {
                warn!("load: dropping unknown group {:?} from the registry", key);
                continue;
            }
            match value.as_u64() {
                Some(n) => pairs.push((key, n as u32)),
                None => {
                    warn!(
                        "load: non-integer count {:?} for group {:?}, starting from zero",
                        value, key
                    );
                    return zero_registry(groups);
                }
            }
        }
        // Missing groups are zero-filled by construction.
        match GroupRegistry::from_counts(groups, &pairs) {
            Result::Ok(r) => r,
            Result::Err(e) => {
                warn!("load: could not rebuild the registry ({}), starting from zero", e);
                zero_registry(groups)
            }
        }
    }

    fn save(&mut self, registry: &GroupRegistry) -> SurveyResult<()> {
        let map: BTreeMap<String, u32> = registry.counts().into_iter().collect();
        let contents = serde_json::to_string_pretty(&map).context(SerializingRegistrySnafu {})?;
        fs::write(&self.path, contents).context(WritingRegistrySnafu {
            path: self.path.clone(),
        })?;
        debug!("save: registry written to {}", self.path);
        Ok(())
    }
}

/// Ephemeral store: counts live for one process and are never written out.
pub struct MemoryStore {
    cached: Option<GroupRegistry>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore { cached: None }
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self, groups: &[Group]) -> GroupRegistry {
        match &self.cached {
            Some(r) => r.clone(),
            None => zero_registry(groups),
        }
    }

    fn save(&mut self, registry: &GroupRegistry) -> SurveyResult<()> {
        self.cached = Some(registry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use group_balance::BalanceErrors;

    fn groups() -> Vec<Group> {
        ["premium", "base", "control"]
            .iter()
            .map(|k| Group {
                key: k.to_string(),
                label: k.to_string(),
            })
            .collect()
    }

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        let path = dir.path().join("group_distribution.json");
        JsonFileStore::new(path.to_str().unwrap())
    }

    #[test]
    fn missing_file_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let registry = store.load(&groups());
        assert_eq!(registry.total(), 0);
        assert_eq!(registry.count_of("premium"), Some(0));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let gs = groups();
        let registry = GroupRegistry::from_counts(
            &gs,
            &[("premium".to_string(), 3), ("control".to_string(), 5)],
        )
        .unwrap();
        store.save(&registry).unwrap();
        assert_eq!(store.load(&gs), registry);
    }

    #[test]
    fn corrupt_json_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_distribution.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(path.to_str().unwrap());
        assert_eq!(store.load(&groups()).total(), 0);
    }

    #[test]
    fn non_integer_count_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_distribution.json");
        fs::write(&path, r#"{"premium": "three"}"#).unwrap();
        let store = JsonFileStore::new(path.to_str().unwrap());
        assert_eq!(store.load(&groups()).total(), 0);
    }

    #[test]
    fn partial_mapping_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_distribution.json");
        fs::write(&path, r#"{"base": 9}"#).unwrap();
        let store = JsonFileStore::new(path.to_str().unwrap());
        let registry = store.load(&groups());
        assert_eq!(registry.count_of("base"), Some(9));
        assert_eq!(registry.count_of("premium"), Some(0));
        assert_eq!(registry.count_of("control"), Some(0));
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_distribution.json");
        fs::write(&path, r#"{"base": 2, "retired_group": 14}"#).unwrap();
        let store = JsonFileStore::new(path.to_str().unwrap());
        let registry = store.load(&groups());
        assert_eq!(registry.count_of("base"), Some(2));
        assert_eq!(registry.total(), 2);
    }

    #[test]
    fn save_failure_surfaces_an_error() {
        let mut store = JsonFileStore::new("/nonexistent-dir/registry.json");
        let gs = groups();
        let registry = GroupRegistry::new(&gs).unwrap();
        assert!(store.save(&registry).is_err());
    }

    #[test]
    fn memory_store_round_trips_within_the_process() {
        let gs = groups();
        let mut store = MemoryStore::new();
        assert_eq!(store.load(&gs).total(), 0);
        let registry =
            GroupRegistry::from_counts(&gs, &[("base".to_string(), 1)]).unwrap();
        store.save(&registry).unwrap();
        assert_eq!(store.load(&gs), registry);
    }

    #[test]
    fn registry_rejects_unknown_group_in_from_counts() {
        let gs = groups();
        let res = GroupRegistry::from_counts(&gs, &[("zz".to_string(), 1)]);
        assert_eq!(
            res.unwrap_err(),
            BalanceErrors::UnknownGroup("zz".to_string())
        );
    }
}
