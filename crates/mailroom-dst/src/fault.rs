//! Fault injection for deterministic testing
//!
//! TigerStyle: Explicit fault types, probabilistic injection.
//!
//! Rules are consulted in registration order on every delivery a
//! `LossyChannel` makes. All draws come from one seeded stream, so a run's
//! fault schedule is a function of the seed and the order of deliveries.

use mailroom_core::DeterministicRng;
use std::sync::atomic::{AtomicU64, Ordering};

/// What can go wrong with one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultType {
    /// The message silently disappears
    MessageDrop,
    /// The message arrives `extra_ticks` later than the channel's own delay
    MessageDelay { extra_ticks: u32 },
    /// The message arrives twice
    MessageDuplicate,
}

impl FaultType {
    pub fn name(&self) -> &'static str {
        match self {
            FaultType::MessageDrop => "message_drop",
            FaultType::MessageDelay { .. } => "message_delay",
            FaultType::MessageDuplicate => "message_duplicate",
        }
    }
}

/// One fault rule
#[derive(Debug, Clone)]
pub struct FaultConfig {
    pub fault_type: FaultType,
    /// Probability of firing per matching delivery (0.0 - 1.0)
    pub probability: f64,
    /// Substring the delivery's operation name must contain
    pub operation_filter: Option<String>,
    /// Stop firing after this many triggers
    pub max_triggers: Option<u64>,
}

impl FaultConfig {
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&probability),
            "probability must be in [0, 1]"
        );

        Self {
            fault_type,
            probability,
            operation_filter: None,
            max_triggers: None,
        }
    }

    /// Only fire for operations containing `filter`
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.operation_filter = Some(filter.into());
        self
    }

    pub fn max_triggers(mut self, max: u64) -> Self {
        self.max_triggers = Some(max);
        self
    }

    fn matches(&self, operation: &str) -> bool {
        self.operation_filter
            .as_deref()
            .map_or(true, |filter| operation.contains(filter))
    }
}

#[derive(Debug)]
struct FaultRule {
    config: FaultConfig,
    trigger_count: AtomicU64,
}

impl FaultRule {
    fn exhausted(&self) -> bool {
        self.config
            .max_triggers
            .is_some_and(|max| self.trigger_count.load(Ordering::SeqCst) >= max)
    }
}

/// Decides the fate of each delivery
///
/// Shared (behind an `Arc`) between the channels that consult it and the test
/// that reads its counters.
#[derive(Debug)]
pub struct FaultInjector {
    rules: Vec<FaultRule>,
    rng: DeterministicRng,
    /// Deliveries the injector was asked about
    operation_count: AtomicU64,
}

impl FaultInjector {
    pub fn new(rng: DeterministicRng, configs: Vec<FaultConfig>) -> Self {
        let rules = configs
            .into_iter()
            .map(|config| FaultRule {
                config,
                trigger_count: AtomicU64::new(0),
            })
            .collect();

        Self {
            rules,
            rng,
            operation_count: AtomicU64::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fault to apply to one delivery of `operation`, if any
    ///
    /// The first rule that fires wins. A rule that does not match the
    /// operation, or has used up its triggers, draws nothing from the RNG.
    pub fn should_inject(&self, operation: &str) -> Option<FaultType> {
        self.operation_count.fetch_add(1, Ordering::SeqCst);

        let rule = self.rules.iter().find(|rule| {
            rule.config.matches(operation)
                && !rule.exhausted()
                && self.rng.next_bool(rule.config.probability)
        })?;

        let triggers = rule.trigger_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            fault = rule.config.fault_type.name(),
            operation = operation,
            trigger_count = triggers,
            "Injecting fault"
        );
        Some(rule.config.fault_type.clone())
    }

    pub fn operation_count(&self) -> u64 {
        self.operation_count.load(Ordering::SeqCst)
    }

    /// Total triggers of one fault type across all rules
    pub fn trigger_count(&self, name: &str) -> u64 {
        self.rules
            .iter()
            .filter(|rule| rule.config.fault_type.name() == name)
            .map(|rule| rule.trigger_count.load(Ordering::SeqCst))
            .sum()
    }

    /// Per-rule counters, in registration order
    pub fn stats(&self) -> Vec<FaultStats> {
        self.rules
            .iter()
            .map(|rule| FaultStats {
                fault_type: rule.config.fault_type.name(),
                operation_filter: rule.config.operation_filter.clone(),
                probability: rule.config.probability,
                trigger_count: rule.trigger_count.load(Ordering::SeqCst),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaultStats {
    pub fault_type: &'static str,
    pub operation_filter: Option<String>,
    pub probability: f64,
    pub trigger_count: u64,
}

/// Builder for a `FaultInjector` with several rules
pub struct FaultInjectorBuilder {
    rng: DeterministicRng,
    faults: Vec<FaultConfig>,
}

impl FaultInjectorBuilder {
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            rng,
            faults: Vec::new(),
        }
    }

    pub fn with_fault(mut self, config: FaultConfig) -> Self {
        self.faults.push(config);
        self
    }

    pub fn build(self) -> FaultInjector {
        FaultInjector::new(self.rng, self.faults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injector(faults: Vec<FaultConfig>) -> FaultInjector {
        FaultInjector::new(DeterministicRng::new(42), faults)
    }

    #[test]
    fn test_certain_fault_always_fires() {
        let injector = injector(vec![FaultConfig::new(FaultType::MessageDrop, 1.0)]);

        for _ in 0..10 {
            assert_eq!(
                injector.should_inject("deliver:message-store"),
                Some(FaultType::MessageDrop)
            );
        }
        assert_eq!(injector.trigger_count("message_drop"), 10);
    }

    #[test]
    fn test_zero_probability_never_fires() {
        let injector = injector(vec![FaultConfig::new(FaultType::MessageDrop, 0.0)]);

        for _ in 0..100 {
            assert!(injector.should_inject("deliver:message-store").is_none());
        }
        assert_eq!(injector.operation_count(), 100);
    }

    #[test]
    fn test_filter_limits_to_matching_operations() {
        let injector = injector(vec![
            FaultConfig::new(FaultType::MessageDrop, 1.0).with_filter("message-store")
        ]);

        assert!(injector.should_inject("deliver:message-store").is_some());
        assert!(injector.should_inject("deliver:worker-0").is_none());
    }

    #[test]
    fn test_max_triggers() {
        let injector = injector(vec![
            FaultConfig::new(FaultType::MessageDrop, 1.0).max_triggers(2)
        ]);

        assert!(injector.should_inject("send").is_some());
        assert!(injector.should_inject("send").is_some());
        assert!(injector.should_inject("send").is_none());
        assert_eq!(injector.trigger_count("message_drop"), 2);
        assert_eq!(injector.operation_count(), 3);
    }

    #[test]
    fn test_first_firing_rule_wins() {
        let injector = FaultInjectorBuilder::new(DeterministicRng::new(5))
            .with_fault(FaultConfig::new(FaultType::MessageDuplicate, 1.0).max_triggers(1))
            .with_fault(FaultConfig::new(FaultType::MessageDelay { extra_ticks: 3 }, 1.0))
            .build();

        assert_eq!(
            injector.should_inject("send"),
            Some(FaultType::MessageDuplicate)
        );
        assert_eq!(
            injector.should_inject("send"),
            Some(FaultType::MessageDelay { extra_ticks: 3 })
        );

        let stats = injector.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].fault_type, "message_duplicate");
        assert_eq!(stats[0].trigger_count, 1);
        assert_eq!(stats[1].trigger_count, 1);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let schedule = || {
            let injector = injector(vec![FaultConfig::new(FaultType::MessageDrop, 0.5)]);
            (0..50)
                .map(|_| injector.should_inject("send").is_some())
                .collect::<Vec<_>>()
        };
        assert_eq!(schedule(), schedule());
    }
}
