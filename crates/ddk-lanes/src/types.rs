use serde::{Deserialize, Serialize};

/// Work-queue bucket an order is displayed under.
///
/// Never stored; derived per order per tick from the order snapshot and the
/// order's offer record (if any).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    NeedsDriver,
    Searching,
    Offered,
    Assigned,
    Problem,
}

impl Lane {
    pub const ALL: [Lane; 5] = [
        Lane::NeedsDriver,
        Lane::Searching,
        Lane::Offered,
        Lane::Assigned,
        Lane::Problem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::NeedsDriver => "needs_driver",
            Lane::Searching => "searching",
            Lane::Offered => "offered",
            Lane::Assigned => "assigned",
            Lane::Problem => "problem",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an order's age relative to its lane budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaLevel {
    Good,
    Warn,
    Bad,
}

/// Per-lane SLA thresholds in seconds.
///
/// `budget_secs == 0` means the lane has no SLA: every age evaluates Good.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaBudget {
    pub budget_secs: i64,
    pub warn_secs: i64,
    pub bad_secs: i64,
}

impl SlaBudget {
    pub const fn new(budget_secs: i64, warn_secs: i64, bad_secs: i64) -> Self {
        Self {
            budget_secs,
            warn_secs,
            bad_secs,
        }
    }

    /// A lane without an SLA.
    pub const fn none() -> Self {
        Self::new(0, 0, 0)
    }
}

/// The full per-lane budget table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub needs_driver: SlaBudget,
    pub searching: SlaBudget,
    pub offered: SlaBudget,
    pub assigned: SlaBudget,
    pub problem: SlaBudget,
}

impl SlaPolicy {
    pub fn for_lane(&self, lane: Lane) -> SlaBudget {
        match lane {
            Lane::NeedsDriver => self.needs_driver,
            Lane::Searching => self.searching,
            Lane::Offered => self.offered,
            Lane::Assigned => self.assigned,
            Lane::Problem => self.problem,
        }
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            needs_driver: SlaBudget::new(180, 120, 180),
            searching: SlaBudget::new(180, 120, 180),
            offered: SlaBudget::new(120, 90, 120),
            assigned: SlaBudget::new(600, 480, 600),
            problem: SlaBudget::new(120, 60, 120),
        }
    }
}

/// Result of evaluating one order against its lane budget.
///
/// Ephemeral: recomputed every tick, never cached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaEval {
    pub age_secs: i64,
    pub budget_secs: i64,
    pub level: SlaLevel,
}
