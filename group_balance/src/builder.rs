pub use crate::config::*;
use crate::{Balancer, GroupRegistry};

/// A builder for setting up a study.
///
/// It assembles the group set, the balancing rules and any pre-existing
/// counts loaded from a persisted registry, and produces the balancer
/// together with the registry it operates on.
///
/// ```
/// pub use group_balance::builder::Builder;
/// pub use group_balance::BalanceRules;
/// # use group_balance::BalanceErrors;
///
/// let (mut balancer, mut registry) = Builder::new(&BalanceRules::DEFAULT_RULES)?
///     .group("premium", "Premium")
///     .group("base", "Base")
///     .group("control", "Control")
///     .build()?;
///
/// balancer.assign(&mut registry)?;
///
/// # Ok::<(), BalanceErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: BalanceRules,
    pub(crate) _groups: Vec<Group>,
    pub(crate) _counts: Vec<(String, u32)>,
}

impl Builder {
    pub fn new(rules: &BalanceRules) -> Result<Builder, BalanceErrors> {
        if rules.capacity == 0 {
            return Err(BalanceErrors::ZeroCapacity);
        }
        Ok(Builder {
            _rules: *rules,
            _groups: Vec::new(),
            _counts: Vec::new(),
        })
    }

    /// Adds one group with a human-readable label.
    pub fn group(mut self, key: &str, label: &str) -> Builder {
        self._groups.push(Group {
            key: key.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Adds groups whose labels are the same as their keys.
    ///
    /// It is the simplest use case for most studies.
    pub fn groups(mut self, keys: &[String]) -> Builder {
        for key in keys {
            self._groups.push(Group {
                key: key.clone(),
                label: key.clone(),
            });
        }
        self
    }

    /// Seeds a group with a count loaded from a persisted registry.
    pub fn count(mut self, key: &str, count: u32) -> Builder {
        self._counts.push((key.to_string(), count));
        self
    }

    pub fn build(self) -> Result<(Balancer, GroupRegistry), BalanceErrors> {
        let registry = GroupRegistry::from_counts(&self._groups, &self._counts)?;
        let balancer = Balancer::new(&self._groups, &self._rules)?;
        Ok((balancer, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_seeds_counts() {
        let (mut balancer, mut registry) = Builder::new(&BalanceRules {
            capacity: 3,
            tie_break: TieBreakMode::Seeded(1),
        })
        .unwrap()
        .group("a", "A")
        .group("b", "B")
        .count("a", 3)
        .build()
        .unwrap();
        // Only b has room left.
        match balancer.assign(&mut registry).unwrap() {
            AssignmentOutcome::Assigned(a) => assert_eq!(a.group_key, "b"),
            AssignmentOutcome::Exhausted => panic!("a slot was expected"),
        }
    }

    #[test]
    fn builder_rejects_unknown_count_key() {
        let res = Builder::new(&BalanceRules::DEFAULT_RULES)
            .unwrap()
            .group("a", "A")
            .count("zz", 1)
            .build();
        assert!(res.is_err());
    }
}
