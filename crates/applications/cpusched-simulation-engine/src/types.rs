//! Core types for the simulation engine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Coarse scheduling state of a process at one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    NotArrived,
    Ready,
    Running,
    Blocked,
    Terminated,
}

impl ProcessState {
    /// Short label used by status tables
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::NotArrived => "...",
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Run",
            ProcessState::Blocked => "Block",
            ProcessState::Terminated => "Term",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A simulated job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    pub arrival_time: u32,
    /// Alternating CPU, I/O, CPU, ... burst lengths
    pub burst_sequence: Vec<u32>,
    /// Even = CPU phase, odd = I/O phase
    pub burst_index: usize,
    /// Work left in the current phase (mirrors `io_timer` during I/O)
    pub remaining_burst: u32,
    pub total_cpu_burst: u32,
    pub priority: u32,
    pub io_timer: u32,

    // Terminal state, zero until the process finishes
    pub is_finished: bool,
    pub completion_time: u32,
    pub turnaround_time: u32,
    pub waiting_time: u32,
}

/// Sum of the CPU phases (even indices), `None` on overflow
fn cpu_total(burst_sequence: &[u32]) -> Option<u32> {
    burst_sequence
        .iter()
        .step_by(2)
        .try_fold(0u32, |acc, &b| acc.checked_add(b))
}

impl Process {
    /// Total CPU demand saturates at `u32::MAX`; [`Process::validate`] rejects such records
    pub fn new(
        id: impl Into<String>,
        arrival_time: u32,
        burst_sequence: Vec<u32>,
        priority: u32,
    ) -> Self {
        let total_cpu_burst = cpu_total(&burst_sequence).unwrap_or(u32::MAX);
        let remaining_burst = burst_sequence.first().copied().unwrap_or(0);

        Process {
            id: id.into(),
            arrival_time,
            burst_sequence,
            burst_index: 0,
            remaining_burst,
            total_cpu_burst,
            priority,
            io_timer: 0,
            is_finished: false,
            completion_time: 0,
            turnaround_time: 0,
            waiting_time: 0,
        }
    }

    /// Single CPU burst, default priority
    pub fn cpu_only(id: impl Into<String>, arrival_time: u32, burst: u32) -> Self {
        Self::new(id, arrival_time, vec![burst], 1)
    }

    /// Check the record can enter the simulation loop
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SimError::malformed(&self.id, "empty process id"));
        }
        if self.burst_sequence.is_empty() {
            return Err(SimError::malformed(&self.id, "empty burst sequence"));
        }
        if let Some(pos) = self.burst_sequence.iter().position(|&b| b == 0) {
            return Err(SimError::malformed(
                &self.id,
                format!("burst {} has zero length", pos),
            ));
        }
        if cpu_total(&self.burst_sequence).is_none() {
            return Err(SimError::malformed(&self.id, "total CPU burst overflows"));
        }
        Ok(())
    }

    /// Keep only the first CPU burst (policies without I/O modelling)
    pub fn truncate_to_first_burst(&mut self) {
        self.burst_sequence.truncate(1);
        self.total_cpu_burst = self.burst_sequence.first().copied().unwrap_or(0);
        self.burst_index = 0;
        self.remaining_burst = self.total_cpu_burst;
    }

    /// Whether another phase follows the current one
    pub fn has_next_phase(&self) -> bool {
        self.burst_index + 1 < self.burst_sequence.len()
    }

    /// Move to the next phase and load its length as remaining work
    pub fn advance_phase(&mut self) -> u32 {
        self.burst_index += 1;
        self.remaining_burst = self.burst_sequence.get(self.burst_index).copied().unwrap_or(0);
        self.remaining_burst
    }

    /// Mark the process finished at `time` and compute its statistics
    pub fn finish(&mut self, time: u32) {
        self.is_finished = true;
        self.completion_time = time;
        self.turnaround_time = time.saturating_sub(self.arrival_time);
        self.waiting_time = self.turnaround_time.saturating_sub(self.total_cpu_burst);
    }
}

/// A process waiting on I/O, with the ticks it still has to wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEntry {
    pub id: String,
    pub io_remaining: u32,
}

impl fmt::Display for BlockedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.io_remaining)
    }
}

/// Per-process status line of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub id: String,
    pub state: ProcessState,
    pub remaining_burst: u32,
}

/// Recorded system state at one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u32,
    /// `None` when the CPU is idle
    pub cpu_occupant: Option<String>,
    /// Round Robin only
    pub quantum_remaining: Option<u32>,
    pub ready_queue: Vec<String>,
    pub blocked_queue: Vec<BlockedEntry>,
    pub terminated: Vec<String>,
    /// Processes that arrived in the ready queue at exactly this tick
    pub arrivals: Vec<String>,
    pub process_states: Vec<ProcessStatus>,
    pub is_final: bool,
    /// Populated on the final snapshot only
    pub final_stats: Option<Vec<Process>>,
}

impl Snapshot {
    /// CPU occupant for display, `Idle` when empty
    pub fn cpu_label(&self) -> &str {
        self.cpu_occupant.as_deref().unwrap_or("Idle")
    }

    pub fn is_idle(&self) -> bool {
        self.cpu_occupant.is_none()
    }

    /// Status line for a given process id
    pub fn status_of(&self, id: &str) -> Option<&ProcessStatus> {
        self.process_states.iter().find(|s| s.id == id)
    }
}

/// Ordered sequence of snapshots produced by one simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub policy_name: String,
    pub snapshots: Vec<Snapshot>,
}

impl Trace {
    pub fn new(policy_name: impl Into<String>) -> Self {
        Trace {
            policy_name: policy_name.into(),
            snapshots: Vec::new(),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Random access by step index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// A trace is complete when its last snapshot is the final summary
    pub fn is_complete(&self) -> bool {
        self.last().is_some_and(|s| s.is_final)
    }

    /// Final process records, if the run completed
    pub fn final_stats(&self) -> Option<&[Process]> {
        self.last().and_then(|s| s.final_stats.as_deref())
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_creation_sums_cpu_phases() {
        let p = Process::new("P1", 0, vec![4, 2, 3], 1);

        assert_eq!(p.total_cpu_burst, 7); // 4 + 3, I/O excluded
        assert_eq!(p.remaining_burst, 4);
        assert_eq!(p.burst_index, 0);
        assert_eq!(p.io_timer, 0);
        assert!(!p.is_finished);
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        assert!(Process::cpu_only("P1", 0, 5).validate().is_ok());

        let empty = Process::new("P2", 0, vec![], 1);
        assert!(matches!(
            empty.validate(),
            Err(SimError::MalformedProcess { .. })
        ));

        let zero = Process::new("P3", 0, vec![3, 0, 2], 1);
        assert!(matches!(
            zero.validate(),
            Err(SimError::MalformedProcess { .. })
        ));
    }

    #[test]
    fn test_phase_navigation() {
        let mut p = Process::new("P1", 0, vec![4, 2, 3], 1);

        assert!(p.has_next_phase());
        assert_eq!(p.advance_phase(), 2);
        assert!(p.has_next_phase());
        assert_eq!(p.advance_phase(), 3);
        assert!(!p.has_next_phase());
    }

    #[test]
    fn test_cpu_total_overflow_is_rejected() {
        let p = Process::new("P1", 0, vec![4_000_000_000, 1, 4_000_000_000], 1);

        assert_eq!(p.total_cpu_burst, u32::MAX);
        assert!(matches!(
            p.validate(),
            Err(SimError::MalformedProcess { ref reason, .. }) if reason == "total CPU burst overflows"
        ));

        // I/O phases do not count towards the total
        let io_heavy = Process::new("P2", 0, vec![1, u32::MAX, 1], 1);
        assert_eq!(io_heavy.total_cpu_burst, 2);
        assert!(io_heavy.validate().is_ok());
    }

    #[test]
    fn test_truncate_to_first_burst() {
        let mut p = Process::new("P1", 0, vec![4, 2, 3], 1);
        p.truncate_to_first_burst();

        assert_eq!(p.burst_sequence, vec![4]);
        assert_eq!(p.total_cpu_burst, 4);
        assert!(!p.has_next_phase());
    }

    #[test]
    fn test_finish_computes_statistics() {
        let mut p = Process::cpu_only("P2", 1, 3);
        p.finish(8);

        assert!(p.is_finished);
        assert_eq!(p.completion_time, 8);
        assert_eq!(p.turnaround_time, 7);
        assert_eq!(p.waiting_time, 4);
    }

    #[test]
    fn test_blocked_entry_display() {
        let entry = BlockedEntry {
            id: "P1".to_string(),
            io_remaining: 2,
        };
        assert_eq!(entry.to_string(), "P1 (2)");
    }

    #[test]
    fn test_trace_completeness() {
        let mut trace = Trace::new("FCFS");
        assert!(!trace.is_complete());
        assert!(trace.final_stats().is_none());

        trace.push(Snapshot {
            time: 0,
            cpu_occupant: None,
            quantum_remaining: None,
            ready_queue: vec![],
            blocked_queue: vec![],
            terminated: vec![],
            arrivals: vec![],
            process_states: vec![],
            is_final: true,
            final_stats: Some(vec![]),
        });

        assert!(trace.is_complete());
        assert_eq!(trace.get(0).map(|s| s.cpu_label()), Some("Idle"));
    }
}
