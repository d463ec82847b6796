//! Pure routing decisions from one inbound event to one (or every) instance
//! of the downstream operator (§4.3 of the design).

use crate::event::Event;

/// The outcome of a grouping decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingTarget {
    /// Deliver only to the instance at this index, `0..num_instances`.
    Instance(usize),
    /// Deliver to every instance (the `BROADCAST` sentinel of the design).
    Broadcast,
}

/// A routing strategy consulted by the `DispatchExecutor` on its own thread.
///
/// Strategies run single-threaded on the dispatcher, so mutable state (e.g.
/// `RoundRobin`'s counter) needs no synchronization of its own. The trait
/// takes `&mut self` rather than `&self` to make that state explicit instead
/// of hiding it behind interior mutability.
pub trait GroupingStrategy: Send {
    /// Decide where `event` should go, given that the destination operator
    /// currently has `num_instances` replicas.
    fn instance_for(&mut self, event: &Event, num_instances: usize) -> GroupingTarget;

    /// A short name for logging; defaults to the type name.
    fn name(&self) -> &str {
        "grouping"
    }
}

/// Cycles destinations `0, 1, .., N-1, 0, 1, ..` regardless of the event's
/// content.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupingStrategy for RoundRobin {
    fn instance_for(&mut self, _event: &Event, num_instances: usize) -> GroupingTarget {
        let target = self.next % num_instances;
        self.next = self.next.wrapping_add(1);
        GroupingTarget::Instance(target)
    }

    fn name(&self) -> &str {
        "round_robin"
    }
}

/// Hashes a key extracted from each event and routes by `hash(key) % N`.
/// The same key always maps to the same instance within one process run
/// because the hash is computed with a fixed seed (see
/// [`crate::hash::stable_hash`]), not language/process-default randomized
/// hashing.
pub struct FieldGrouping<F> {
    key_fn: F,
}

impl<F> FieldGrouping<F>
where
    F: FnMut(&Event) -> String + Send,
{
    /// `key_fn` extracts the grouping key from an event, e.g.
    /// `|e| e.get_field("user_account").unwrap().to_string()`.
    pub fn new(key_fn: F) -> Self {
        Self { key_fn }
    }
}

impl<F> GroupingStrategy for FieldGrouping<F>
where
    F: FnMut(&Event) -> String + Send,
{
    fn instance_for(&mut self, event: &Event, num_instances: usize) -> GroupingTarget {
        let key = (self.key_fn)(event);
        let target = (crate::hash::stable_hash(&key) % num_instances as u64) as usize;
        log::trace!("field grouping: key `{key}` -> instance {target}");
        GroupingTarget::Instance(target)
    }

    fn name(&self) -> &str {
        "field_grouping"
    }
}

/// Always broadcasts: every event is delivered to every instance. This is
/// the default grouping of a `JoinOperator`.
#[derive(Debug, Default)]
pub struct AllGrouping;

impl AllGrouping {
    pub fn new() -> Self {
        Self
    }
}

impl GroupingStrategy for AllGrouping {
    fn instance_for(&mut self, _event: &Event, _num_instances: usize) -> GroupingTarget {
        GroupingTarget::Broadcast
    }

    fn name(&self) -> &str {
        "all_grouping"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_instances() {
        let mut strategy = RoundRobin::new();
        let event = Event::single("x", 1);
        let targets: Vec<_> = (0..5)
            .map(|_| strategy.instance_for(&event, 2))
            .collect();
        assert_eq!(
            targets,
            vec![
                GroupingTarget::Instance(0),
                GroupingTarget::Instance(1),
                GroupingTarget::Instance(0),
                GroupingTarget::Instance(1),
                GroupingTarget::Instance(0),
            ]
        );
    }

    #[test]
    fn field_grouping_is_stable_for_the_same_key() {
        let mut strategy = FieldGrouping::new(|e: &Event| {
            e.get_field("key").unwrap().as_str().unwrap().to_string()
        });
        let k1a = Event::single("key", "k1");
        let k1b = Event::single("key", "k1");
        let a = strategy.instance_for(&k1a, 3);
        let b = strategy.instance_for(&k1b, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn all_grouping_always_broadcasts() {
        let mut strategy = AllGrouping::new();
        let event = Event::single("x", 1);
        assert_eq!(strategy.instance_for(&event, 5), GroupingTarget::Broadcast);
    }

    // Round robin over N destinations and K events lands either floor(K/N)
    // or ceil(K/N) events on each destination, and the counts sum back to K.
    // Checked over random (N, K) pairs rather than one fixed case.
    #[test]
    fn round_robin_balances_within_one_across_random_instance_counts() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(0xC0FF_EE);
        let event = Event::single("x", 1);

        for _ in 0..200 {
            let num_instances = rng.random_range(1..=32);
            let num_events = rng.random_range(0..=500);

            let mut strategy = RoundRobin::new();
            let mut counts = vec![0u64; num_instances];
            for _ in 0..num_events {
                match strategy.instance_for(&event, num_instances) {
                    GroupingTarget::Instance(i) => counts[i] += 1,
                    GroupingTarget::Broadcast => panic!("round robin never broadcasts"),
                }
            }

            let total: u64 = counts.iter().sum();
            assert_eq!(total, num_events as u64);

            let floor = num_events as u64 / num_instances as u64;
            let ceil = floor + if num_events as u64 % num_instances as u64 == 0 { 0 } else { 1 };
            for count in counts {
                assert!(
                    count == floor || count == ceil,
                    "instance count {count} outside [{floor}, {ceil}] for N={num_instances}, K={num_events}"
                );
            }
        }
    }
}
