//! Results table and averages derived from a completed trace

use serde::{Deserialize, Serialize};

use crate::types::{Process, Trace};

/// One line of the results table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: String,
    pub arrival: u32,
    pub total_burst: u32,
    pub completion: u32,
    pub turnaround: u32,
    pub waiting: u32,
}

impl From<&Process> for ResultRow {
    fn from(p: &Process) -> Self {
        ResultRow {
            id: p.id.clone(),
            arrival: p.arrival_time,
            total_burst: p.total_cpu_burst,
            completion: p.completion_time,
            turnaround: p.turnaround_time,
            waiting: p.waiting_time,
        }
    }
}

/// Summary of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub policy_name: String,
    pub rows: Vec<ResultRow>,
    pub avg_turnaround: f64,
    pub avg_waiting: f64,
    /// Tick at which the last process finished
    pub makespan: u32,
    /// Fraction of simulated ticks with a process on the CPU
    pub cpu_utilization: f64,
}

impl SimulationReport {
    /// Build the report from a trace's final snapshot
    ///
    /// Returns `None` for an incomplete trace.
    pub fn from_trace(trace: &Trace) -> Option<Self> {
        let stats = trace.final_stats()?;
        let rows: Vec<ResultRow> = stats.iter().map(ResultRow::from).collect();

        let ticks: Vec<_> = trace.iter().filter(|s| !s.is_final).collect();
        let busy = ticks.iter().filter(|s| !s.is_idle()).count();
        let cpu_utilization = if ticks.is_empty() {
            0.0
        } else {
            busy as f64 / ticks.len() as f64
        };

        Some(SimulationReport {
            policy_name: trace.policy_name.clone(),
            avg_turnaround: mean(rows.iter().map(|r| r.turnaround)),
            avg_waiting: mean(rows.iter().map(|r| r.waiting)),
            makespan: rows.iter().map(|r| r.completion).max().unwrap_or(0),
            cpu_utilization,
            rows,
        })
    }
}

fn mean(values: impl Iterator<Item = u32>) -> f64 {
    let (sum, count) = values.fold((0u64, 0usize), |(s, c), v| (s + u64::from(v), c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Two-decimal display form used for averages
pub fn format_avg(value: f64) -> String {
    format!("{:.2}", value)
}
