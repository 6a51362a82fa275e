use crate::survey::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

use group_balance::{BalanceRules, Group, TieBreakMode};

/// One experimental condition as declared in the study file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub key: String,
    pub label: Option<String>,
}

/// The study description, as read from the JSON config.
///
/// All the fields are optional: an empty document describes the default
/// study (premium/base/control, 15 participants per group, durable file
/// registry).
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(rename = "studyName")]
    pub study_name: Option<String>,
    pub groups: Option<Vec<GroupEntry>>,
    #[serde(rename = "capacityPerGroup")]
    pub capacity_per_group: Option<u32>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "photosDir")]
    pub photos_dir: Option<String>,
    #[serde(rename = "registryFile")]
    pub registry_file: Option<String>,
    #[serde(rename = "resultsFile")]
    pub results_file: Option<String>,
    pub persistence: Option<String>,
    #[serde(rename = "strictRegistry")]
    pub strict_registry: Option<bool>,
}

/// Where the group registry lives between assignments.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PersistenceMode {
    /// A JSON document on disk: capacity is enforced across program runs.
    File,
    /// Process memory only: counts reset with every launch.
    Session,
}

/// A validated study, ready to run.
#[derive(Debug, Clone)]
pub struct Study {
    pub name: String,
    pub groups: Vec<Group>,
    pub rules: BalanceRules,
    pub photos_dir: String,
    pub registry_file: String,
    pub results_file: String,
    pub persistence: PersistenceMode,
    pub strict_registry: bool,
}

pub fn read_study_config(path: &str) -> SurveyResult<StudyConfig> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let config: StudyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingConfigSnafu { path })?;
    debug!("read config: {:?}", config);
    Ok(config)
}

fn default_groups() -> Vec<Group> {
    [
        ("premium", "Premium"),
        ("base", "Base"),
        ("control", "Control"),
    ]
    .iter()
    .map(|(key, label)| Group {
        key: key.to_string(),
        label: label.to_string(),
    })
    .collect()
}

pub fn validate_config(config: &StudyConfig) -> SurveyResult<Study> {
    let groups: Vec<Group> = match &config.groups {
        None => default_groups(),
        Some(entries) => entries
            .iter()
            .map(|e| Group {
                key: e.key.clone(),
                label: e.label.clone().unwrap_or_else(|| e.key.clone()),
            })
            .collect(),
    };
    if groups.is_empty() {
        return InvalidConfigSnafu {
            message: "the study declares no groups".to_string(),
        }
        .fail();
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for g in groups.iter() {
        if !seen.insert(g.key.as_str()) {
            return InvalidConfigSnafu {
                message: format!("duplicate group key {:?}", g.key),
            }
            .fail();
        }
    }

    let capacity = config.capacity_per_group.unwrap_or(15);
    if capacity == 0 {
        return InvalidConfigSnafu {
            message: "capacityPerGroup must be positive".to_string(),
        }
        .fail();
    }

    let tie_break = match config.random_seed.clone().map(|s| s.parse::<u64>()) {
        None => TieBreakMode::Uniform,
        Some(Result::Ok(seed)) => TieBreakMode::Seeded(seed),
        Some(Result::Err(_)) => {
            whatever!(
                "Cannot parse randomSeed {:?} as an integer",
                config.random_seed
            )
        }
    };

    let persistence = match config.persistence.as_deref() {
        None | Some("file") => PersistenceMode::File,
        Some("session") => PersistenceMode::Session,
        Some(x) => {
            whatever!("Unknown persistence mode {:?} (expected file or session)", x)
        }
    };

    Ok(Study {
        name: config
            .study_name
            .clone()
            .unwrap_or_else(|| "Consumer preference study".to_string()),
        groups,
        rules: BalanceRules { capacity, tie_break },
        photos_dir: config
            .photos_dir
            .clone()
            .unwrap_or_else(|| "photos".to_string()),
        registry_file: config
            .registry_file
            .clone()
            .unwrap_or_else(|| "group_distribution.json".to_string()),
        results_file: config
            .results_file
            .clone()
            .unwrap_or_else(|| "results_all.csv".to_string()),
        persistence,
        strict_registry: config.strict_registry.unwrap_or(false),
    })
}
