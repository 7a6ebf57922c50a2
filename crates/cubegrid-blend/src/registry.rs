//! Identifier-dispatched lookup of blend strategies.
//!
//! Identifiers that are not registered resolve to the fallback strategy
//! ([`BlendStrategy::Background`]) without error.

use std::collections::BTreeMap;

use cubegrid_types::BlendingLogic;

use crate::strategy::BlendStrategy;

/// Maps blending-logic identifiers to strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendRegistry {
    entries: BTreeMap<String, BlendStrategy>,
    fallback: BlendStrategy,
}

impl Default for BlendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl BlendRegistry {
    /// A registry holding every built-in strategy under its own name.
    pub fn with_builtins() -> Self {
        let entries = BlendStrategy::ALL
            .into_iter()
            .map(|s| (s.name().to_owned(), s))
            .collect();
        Self {
            entries,
            fallback: BlendStrategy::default(),
        }
    }

    /// Register `id` as an alias for `strategy`, returning any strategy it
    /// replaced.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        strategy: BlendStrategy,
    ) -> Option<BlendStrategy> {
        self.entries.insert(id.into(), strategy)
    }

    /// Register a stored blending-logic record.
    ///
    /// Returns `false` (and registers nothing) when the record names a
    /// strategy that is not built in.
    pub fn register_logic(&mut self, logic: &BlendingLogic) -> bool {
        let Some(strategy) = BlendStrategy::from_name(&logic.strategy) else {
            tracing::warn!(
                logic_id = %logic.logic_id,
                strategy = logic.strategy,
                "Blending logic names an unknown strategy, skipped"
            );
            return false;
        };
        self.register(logic.logic_id.as_str(), strategy);
        true
    }

    /// Resolve `id` to a strategy, falling back silently when unknown.
    pub fn resolve(&self, id: &str) -> BlendStrategy {
        self.entries.get(id).copied().unwrap_or(self.fallback)
    }

    /// Whether `id` is explicitly registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// The strategy used for unknown identifiers.
    pub const fn fallback(&self) -> BlendStrategy {
        self.fallback
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identifiers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
