//! Scheduling policies for CPU dispatch
//!
//! The engine runs one shared tick loop; a policy only decides how the ready
//! queue is served and whether the running process is time-sliced:
//! - Round Robin: FIFO, fixed quantum, multi-phase CPU/I-O bursts
//! - FCFS: FIFO by arrival, runs to completion, first burst only
//! - SJF: non-preemptive shortest total CPU burst, first burst only
//! - Priority: declared, not implemented

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::Process;

/// Policy selector (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    RoundRobin,
    Fcfs,
    Sjf,
    Priority,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::RoundRobin,
        PolicyKind::Fcfs,
        PolicyKind::Sjf,
        PolicyKind::Priority,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::RoundRobin => "RoundRobin",
            PolicyKind::Fcfs => "FCFS",
            PolicyKind::Sjf => "SJF",
            PolicyKind::Priority => "Priority",
        }
    }

    /// Whether this policy takes a quantum
    pub fn uses_quantum(&self) -> bool {
        matches!(self, PolicyKind::RoundRobin)
    }

    /// Build the handler for this policy
    ///
    /// `quantum` is required (and > 0) for Round Robin and ignored otherwise.
    pub fn build(&self, quantum: Option<u32>) -> Result<Box<dyn SchedulingPolicy>> {
        match self {
            PolicyKind::RoundRobin => match quantum {
                Some(q) if q > 0 => Ok(Box::new(RoundRobinPolicy::new(q))),
                other => Err(SimError::InvalidQuantum(other)),
            },
            PolicyKind::Fcfs => Ok(Box::new(FcfsPolicy::new())),
            PolicyKind::Sjf => Ok(Box::new(SjfPolicy::new())),
            PolicyKind::Priority => Err(SimError::NotImplemented(*self)),
        }
    }

    /// Resolve one selector; `all` expands to every declared policy
    pub fn parse_selection(s: &str) -> Result<Vec<PolicyKind>> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.to_vec());
        }
        s.parse().map(|kind| vec![kind])
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rr" | "round-robin" | "roundrobin" | "round_robin" => Ok(PolicyKind::RoundRobin),
            "fcfs" | "fifo" => Ok(PolicyKind::Fcfs),
            "sjf" => Ok(PolicyKind::Sjf),
            "priority" | "prio" => Ok(PolicyKind::Priority),
            _ => Err(SimError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Ready-queue discipline plugged into the shared tick loop
///
/// The ready queue holds indices into the engine's arrival-sorted process table.
pub trait SchedulingPolicy {
    /// Which selector built this handler
    fn kind(&self) -> PolicyKind;

    /// Whether I/O phases of the burst sequence are simulated
    fn models_io(&self) -> bool {
        false
    }

    /// Quantum granted on dispatch, `None` for run-to-completion policies
    fn time_slice(&self) -> Option<u32> {
        None
    }

    /// Remove and return the next process to dispatch at `time`
    fn select_next(
        &mut self,
        ready: &mut VecDeque<usize>,
        processes: &[Process],
        time: u32,
    ) -> Option<usize>;

    /// Get policy name
    fn name(&self) -> &str {
        self.kind().name()
    }
}

/// Round Robin: FIFO queue, preemption after `quantum` ticks
pub struct RoundRobinPolicy {
    quantum: u32,
}

impl RoundRobinPolicy {
    pub fn new(quantum: u32) -> Self {
        RoundRobinPolicy { quantum }
    }
}

impl SchedulingPolicy for RoundRobinPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }

    fn models_io(&self) -> bool {
        true
    }

    fn time_slice(&self) -> Option<u32> {
        Some(self.quantum)
    }

    fn select_next(
        &mut self,
        ready: &mut VecDeque<usize>,
        _processes: &[Process],
        _time: u32,
    ) -> Option<usize> {
        ready.pop_front()
    }
}

/// First-Come-First-Serve: FIFO by arrival, no preemption
pub struct FcfsPolicy;

impl FcfsPolicy {
    pub fn new() -> Self {
        FcfsPolicy
    }
}

impl Default for FcfsPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for FcfsPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fcfs
    }

    fn select_next(
        &mut self,
        ready: &mut VecDeque<usize>,
        processes: &[Process],
        time: u32,
    ) -> Option<usize> {
        let front = *ready.front()?;
        if processes[front].arrival_time <= time {
            ready.pop_front()
        } else {
            None
        }
    }
}

/// Shortest-Job-First, non-preemptive
///
/// The whole ready queue is re-sorted by total CPU burst at every dispatch.
/// Ties fall back to arrival time, then to current queue order.
pub struct SjfPolicy;

impl SjfPolicy {
    pub fn new() -> Self {
        SjfPolicy
    }
}

impl Default for SjfPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for SjfPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Sjf
    }

    fn select_next(
        &mut self,
        ready: &mut VecDeque<usize>,
        processes: &[Process],
        _time: u32,
    ) -> Option<usize> {
        // sort_by_key is stable, so equal keys keep queue order
        ready
            .make_contiguous()
            .sort_by_key(|&idx| (processes[idx].total_cpu_burst, processes[idx].arrival_time));
        ready.pop_front()
    }
}
