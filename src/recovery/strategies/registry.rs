use super::{
    ConfigurationStrategy, EnvironmentStrategy, IncompleteOperationStrategy, IndexStrategy, LockFileStrategy,
    ObjectDatabaseStrategy, RecoveryStrategy, ReferenceStrategy,
};
use crate::detection::{CorruptionIssue, CorruptionType};

/// Ordered strategy table; the first strategy that can handle an issue wins.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn RecoveryStrategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_default_strategies()
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self { strategies: Vec::new() }
    }

    pub fn with_default_strategies() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(LockFileStrategy));
        registry.register(Box::new(IncompleteOperationStrategy));
        registry.register(Box::new(IndexStrategy));
        registry.register(Box::new(ReferenceStrategy));
        registry.register(Box::new(ConfigurationStrategy));
        registry.register(Box::new(ObjectDatabaseStrategy));
        registry.register(Box::new(EnvironmentStrategy));
        registry
    }

    pub fn register(&mut self, strategy: Box<dyn RecoveryStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn find_strategy(&self, issue: &CorruptionIssue) -> Option<&dyn RecoveryStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.can_handle(issue))
            .map(Box::as_ref)
    }

    pub fn find_for_type(&self, issue_type: CorruptionType) -> Option<&dyn RecoveryStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.handled_types().contains(&issue_type))
            .map(Box::as_ref)
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn RecoveryStrategy> {
        self.strategies.iter().map(Box::as_ref)
    }
}
