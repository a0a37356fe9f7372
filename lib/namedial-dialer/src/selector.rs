//! Selection strategies for picking one address out of a service set

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks the address a dial should connect to
pub trait Selector: Send + Sync {
    /// Select one address, or `None` when there is nothing to select from
    fn select<'a>(&self, addrs: &'a [String]) -> Option<&'a String>;
}

/// Uniform random selection, re-rolled on every call
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn select<'a>(&self, addrs: &'a [String]) -> Option<&'a String> {
        if addrs.is_empty() {
            return None;
        }
        addrs.get(rand::thread_rng().gen_range(0..addrs.len()))
    }
}

/// Round-robin selection: deterministic, useful for tests
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobinSelector {
    fn select<'a>(&self, addrs: &'a [String]) -> Option<&'a String> {
        if addrs.is_empty() {
            return None;
        }
        let current = self.counter.fetch_add(1, Ordering::Relaxed);
        addrs.get(current % addrs.len())
    }
}

/// Selection strategy, as named in configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    #[default]
    Random,
    RoundRobin,
}

impl SelectionStrategy {
    pub fn build(&self) -> Box<dyn Selector> {
        match self {
            SelectionStrategy::Random => Box::new(RandomSelector),
            SelectionStrategy::RoundRobin => Box::new(RoundRobinSelector::new()),
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionStrategy::Random => f.write_str("random"),
            SelectionStrategy::RoundRobin => f.write_str("round-robin"),
        }
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(SelectionStrategy::Random),
            "round-robin" | "round_robin" | "roundrobin" => Ok(SelectionStrategy::RoundRobin),
            other => Err(format!("unknown selection strategy: {}", other)),
        }
    }
}
