mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

pub use crate::builder::Builder;
pub use crate::config::*;

/// The registry of assigned-participant counts, one entry per group.
///
/// Invariants: every group of the study is present, and after a successful
/// assignment every count stays at or below the configured capacity. Counts
/// never decrease within a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupRegistry {
    counts: BTreeMap<String, u32>,
}

impl GroupRegistry {
    /// A fresh registry with every group at zero.
    pub fn new(groups: &[Group]) -> Result<GroupRegistry, BalanceErrors> {
        if groups.is_empty() {
            return Err(BalanceErrors::EmptyGroupSet);
        }
        Ok(GroupRegistry {
            counts: groups.iter().map(|g| (g.key.clone(), 0)).collect(),
        })
    }

    /// Rebuilds a registry from persisted (key, count) pairs.
    ///
    /// Groups absent from the pairs start at zero, so a partial store is
    /// recovered rather than rejected. A key outside the group set is an
    /// error: the store layer decides whether to drop it or give up.
    pub fn from_counts(
        groups: &[Group],
        pairs: &[(String, u32)],
    ) -> Result<GroupRegistry, BalanceErrors> {
        let mut registry = GroupRegistry::new(groups)?;
        for (key, count) in pairs.iter() {
            match registry.counts.get_mut(key) {
                Some(slot) => *slot = *count,
                None => return Err(BalanceErrors::UnknownGroup(key.clone())),
            }
        }
        Ok(registry)
    }

    pub fn count_of(&self, key: &str) -> Option<u32> {
        self.counts.get(key).copied()
    }

    /// Total number of assigned participants across all groups.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|c| *c as u64).sum()
    }

    /// All (key, count) pairs, sorted by group key.
    pub fn counts(&self) -> Vec<(String, u32)> {
        self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn is_saturated(&self, rules: &BalanceRules) -> bool {
        self.counts.values().all(|c| *c >= rules.capacity)
    }

    fn bump(&mut self, key: &str) -> Result<u32, BalanceErrors> {
        match self.counts.get_mut(key) {
            Some(slot) => {
                *slot += 1;
                Ok(*slot)
            }
            None => Err(BalanceErrors::UnknownGroup(key.to_string())),
        }
    }
}

/// Decides which experimental group the next participant joins.
///
/// The balancer holds no counts itself: the registry is passed in and out
/// of every call so that the call site owns its lifetime and persistence.
#[derive(Debug)]
pub struct Balancer {
    groups: Vec<Group>,
    rules: BalanceRules,
    rng: StdRng,
}

impl Balancer {
    pub fn new(groups: &[Group], rules: &BalanceRules) -> Result<Balancer, BalanceErrors> {
        if groups.is_empty() {
            return Err(BalanceErrors::EmptyGroupSet);
        }
        if rules.capacity == 0 {
            return Err(BalanceErrors::ZeroCapacity);
        }
        let rng = match rules.tie_break {
            TieBreakMode::Seeded(seed) => StdRng::seed_from_u64(seed),
            TieBreakMode::Uniform => StdRng::from_entropy(),
        };
        Ok(Balancer {
            groups: groups.to_vec(),
            rules: *rules,
            rng,
        })
    }

    pub fn rules(&self) -> &BalanceRules {
        &self.rules
    }

    /// Assigns the next participant to the least-filled group.
    ///
    /// The groups below capacity are filtered first; among them, the ones
    /// tied for the minimum count are collected and one is chosen uniformly
    /// at random. The chosen count is incremented in the registry before the
    /// assignment is returned. With all groups at capacity the registry is
    /// left untouched and `Exhausted` is returned.
    pub fn assign(
        &mut self,
        registry: &mut GroupRegistry,
    ) -> Result<AssignmentOutcome, BalanceErrors> {
        // Every group of the study must be known to the registry.
        for g in self.groups.iter() {
            if registry.count_of(&g.key).is_none() {
                return Err(BalanceErrors::UnknownGroup(g.key.clone()));
            }
        }

        let available: Vec<&Group> = self
            .groups
            .iter()
            .filter(|g| registry.count_of(&g.key).unwrap() < self.rules.capacity)
            .collect();
        if available.is_empty() {
            debug!(
                "assign: all {} groups at capacity {}",
                self.groups.len(),
                self.rules.capacity
            );
            return Ok(AssignmentOutcome::Exhausted);
        }

        let min_count = available
            .iter()
            .map(|g| registry.count_of(&g.key).unwrap())
            .min()
            .unwrap();
        let tied: Vec<&Group> = available
            .iter()
            .filter(|g| registry.count_of(&g.key).unwrap() == min_count)
            .cloned()
            .collect();
        assert!(!tied.is_empty());
        debug!(
            "assign: min count {:?}, tied for minimum: {:?}",
            min_count, tied
        );

        // `choose` is uniform over the tied slice.
        let chosen: &Group = *tied.choose(&mut self.rng).unwrap();
        let new_count = registry.bump(&chosen.key)?;
        info!(
            "assign: group {} selected, count now {}/{}",
            chosen.key, new_count, self.rules.capacity
        );
        Ok(AssignmentOutcome::Assigned(Assignment {
            group_key: chosen.key.clone(),
            label: chosen.label.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(keys: &[&str]) -> Vec<Group> {
        keys.iter()
            .map(|k| Group {
                key: k.to_string(),
                label: k.to_uppercase(),
            })
            .collect()
    }

    fn seeded_rules(capacity: u32, seed: u64) -> BalanceRules {
        BalanceRules {
            capacity,
            tie_break: TieBreakMode::Seeded(seed),
        }
    }

    #[test]
    fn empty_group_set_is_rejected() {
        assert_eq!(
            GroupRegistry::new(&[]).unwrap_err(),
            BalanceErrors::EmptyGroupSet
        );
        assert_eq!(
            Balancer::new(&[], &BalanceRules::DEFAULT_RULES).unwrap_err(),
            BalanceErrors::EmptyGroupSet
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let gs = groups(&["a", "b"]);
        assert_eq!(
            Balancer::new(&gs, &seeded_rules(0, 1)).unwrap_err(),
            BalanceErrors::ZeroCapacity
        );
    }

    #[test]
    fn from_counts_fills_missing_groups_with_zero() {
        let gs = groups(&["premium", "base", "control"]);
        let registry =
            GroupRegistry::from_counts(&gs, &[("base".to_string(), 7)]).unwrap();
        assert_eq!(registry.count_of("premium"), Some(0));
        assert_eq!(registry.count_of("base"), Some(7));
        assert_eq!(registry.count_of("control"), Some(0));
        assert_eq!(registry.total(), 7);
    }

    #[test]
    fn from_counts_rejects_unknown_groups() {
        let gs = groups(&["a", "b"]);
        let res = GroupRegistry::from_counts(&gs, &[("c".to_string(), 1)]);
        assert_eq!(res.unwrap_err(), BalanceErrors::UnknownGroup("c".to_string()));
    }

    #[test]
    fn counts_never_exceed_capacity() {
        let gs = groups(&["premium", "base", "control"]);
        let rules = seeded_rules(15, 42);
        let mut balancer = Balancer::new(&gs, &rules).unwrap();
        let mut registry = GroupRegistry::new(&gs).unwrap();
        // Keep asking well past saturation.
        for _ in 0..100 {
            balancer.assign(&mut registry).unwrap();
            for (_, count) in registry.counts() {
                assert!(count <= rules.capacity);
            }
        }
        assert_eq!(registry.total(), 45);
    }

    #[test]
    fn saturated_registry_yields_exhausted_and_is_unchanged() {
        let gs = groups(&["a", "b", "c"]);
        let rules = seeded_rules(4, 7);
        let mut balancer = Balancer::new(&gs, &rules).unwrap();
        let mut registry = GroupRegistry::new(&gs).unwrap();
        for _ in 0..12 {
            match balancer.assign(&mut registry).unwrap() {
                AssignmentOutcome::Assigned(_) => {}
                AssignmentOutcome::Exhausted => panic!("exhausted too early"),
            }
        }
        assert!(registry.is_saturated(&rules));
        let snapshot = registry.clone();
        assert_eq!(
            balancer.assign(&mut registry).unwrap(),
            AssignmentOutcome::Exhausted
        );
        assert_eq!(registry, snapshot);
    }

    #[test]
    fn greedy_minimum_fill_keeps_spread_at_most_one() {
        let gs = groups(&["premium", "base", "control"]);
        let rules = seeded_rules(15, 3);
        let mut balancer = Balancer::new(&gs, &rules).unwrap();
        let mut registry = GroupRegistry::new(&gs).unwrap();
        for _ in 0..45 {
            balancer.assign(&mut registry).unwrap();
            let counts: Vec<u32> = registry
                .counts()
                .iter()
                .map(|(_, c)| *c)
                .filter(|c| *c < rules.capacity)
                .collect();
            if counts.is_empty() {
                continue;
            }
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "unbalanced registry: {:?}", registry);
        }
    }

    #[test]
    fn two_groups_capacity_two_scenario() {
        let gs = groups(&["a", "b"]);
        let rules = seeded_rules(2, 11);
        let mut balancer = Balancer::new(&gs, &rules).unwrap();
        let mut registry = GroupRegistry::new(&gs).unwrap();
        for _ in 0..4 {
            balancer.assign(&mut registry).unwrap();
            // No group reaches 2 while the other is still at 0.
            let a = registry.count_of("a").unwrap();
            let b = registry.count_of("b").unwrap();
            assert!(!(a == 2 && b == 0));
            assert!(!(b == 2 && a == 0));
        }
        assert_eq!(registry.count_of("a"), Some(2));
        assert_eq!(registry.count_of("b"), Some(2));
        assert_eq!(
            balancer.assign(&mut registry).unwrap(),
            AssignmentOutcome::Exhausted
        );
    }

    #[test]
    fn seeded_tie_break_is_reproducible() {
        let gs = groups(&["a", "b", "c"]);
        let rules = seeded_rules(5, 99);
        let run = || {
            let mut balancer = Balancer::new(&gs, &rules).unwrap();
            let mut registry = GroupRegistry::new(&gs).unwrap();
            let mut picks: Vec<String> = Vec::new();
            for _ in 0..15 {
                if let AssignmentOutcome::Assigned(a) = balancer.assign(&mut registry).unwrap() {
                    picks.push(a.group_key);
                }
            }
            picks
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn tie_break_reaches_every_group() {
        // With a fresh registry all groups are tied. Across seeds, the first
        // pick must not collapse onto a single group.
        let gs = groups(&["a", "b", "c"]);
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        for seed in 0..64 {
            let mut balancer = Balancer::new(&gs, &seeded_rules(5, seed)).unwrap();
            let mut registry = GroupRegistry::new(&gs).unwrap();
            if let AssignmentOutcome::Assigned(a) = balancer.assign(&mut registry).unwrap() {
                seen.insert(a.group_key);
            }
        }
        assert_eq!(seen.len(), 3, "first pick never reached: {:?}", seen);
    }
}
