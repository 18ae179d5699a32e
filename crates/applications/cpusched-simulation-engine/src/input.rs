//! Process table input layer
//!
//! Turns user-facing rows (arrival, burst text, priority) into the normalized
//! [`Process`] records the engine consumes. Burst text is a comma-separated
//! list such as `"4, 2, 3"` meaning CPU 4, I/O 2, CPU 3.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SimError};
use crate::policies::PolicyKind;
use crate::types::Process;

/// Default priority for rows that do not set one
pub const DEFAULT_PRIORITY: u32 = 1;

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

/// Parse a burst sequence, keeping only positive integers
///
/// Unparseable or zero entries are dropped rather than rejected.
pub fn parse_burst_sequence(text: &str) -> Vec<u32> {
    text.split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .collect()
}

/// First burst of the text, if it is a positive integer
fn parse_first_burst(text: &str) -> Option<u32> {
    text.split(',')
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
}

/// One row of the process table, as entered by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRow {
    /// Assigned by [`ProcessTable`] when left empty
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub arrival: u32,
    pub bursts: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl ProcessRow {
    pub fn new(id: impl Into<String>, arrival: u32, bursts: impl Into<String>, priority: u32) -> Self {
        ProcessRow {
            id: id.into(),
            arrival,
            bursts: bursts.into(),
            priority,
        }
    }

    /// Parse `arrival:bursts[:priority]`, e.g. `0:4,2,3` or `2:5:3`
    ///
    /// The id is left empty for the table to assign.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':');

        let arrival = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SimError::invalid_input(format!("missing arrival in '{}'", spec)))?
            .parse::<u32>()
            .map_err(|e| SimError::invalid_input(format!("bad arrival in '{}': {}", spec, e)))?;

        let bursts = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SimError::invalid_input(format!("missing bursts in '{}'", spec)))?
            .to_string();

        let priority = match parts.next() {
            Some(p) => p
                .trim()
                .parse::<u32>()
                .map_err(|e| SimError::invalid_input(format!("bad priority in '{}': {}", spec, e)))?,
            None => DEFAULT_PRIORITY,
        };

        if parts.next().is_some() {
            return Err(SimError::invalid_input(format!(
                "expected arrival:bursts[:priority], got '{}'",
                spec
            )));
        }

        Ok(ProcessRow::new(String::new(), arrival, bursts, priority))
    }

    /// Build the engine record for this row, or `None` if no usable burst remains
    ///
    /// Only Round Robin with I/O enabled keeps the full CPU/I-O sequence; every
    /// other combination runs the first CPU burst alone.
    pub fn to_process(&self, policy: PolicyKind, io_enabled: bool) -> Option<Process> {
        let sequence = if policy == PolicyKind::RoundRobin && io_enabled {
            parse_burst_sequence(&self.bursts)
        } else {
            parse_first_burst(&self.bursts).into_iter().collect()
        };

        if sequence.is_empty() {
            return None;
        }
        Some(Process::new(self.id.clone(), self.arrival, sequence, self.priority))
    }
}

/// Editable list of process rows with `P<n>` id generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTable {
    rows: Vec<ProcessRow>,
    next_id: u32,
}

impl ProcessTable {
    /// Empty table, ids start at `P1`
    pub fn new() -> Self {
        ProcessTable {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    /// Table pre-filled with `P1`..`P3`; new rows continue at `P4`
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.add_row(0, "5, 2, 3", DEFAULT_PRIORITY);
        table.add_row(1, "3", 2);
        table.add_row(2, "4, 1, 2", 3);
        table
    }

    /// Load rows from a JSON array; rows without an id get the next `P<n>`
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<ProcessRow> = serde_json::from_str(json)
            .map_err(|e| SimError::invalid_input(format!("process rows: {}", e)))?;

        let mut table = Self::new();
        for row in rows {
            table.push(row);
        }
        Ok(table)
    }

    /// Next free `P<n>`, skipping ids already carried by explicit rows
    fn allocate_id(&mut self) -> String {
        loop {
            let id = format!("P{}", self.next_id);
            self.next_id += 1;
            if !self.rows.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }

    /// Keep the counter past an explicit `P<k>` id
    fn reserve_id(&mut self, id: &str) {
        if let Some(k) = id.strip_prefix('P').and_then(|n| n.parse::<u32>().ok()) {
            self.next_id = self.next_id.max(k.saturating_add(1));
        }
    }

    /// Append a row with a freshly generated id
    pub fn add_row(&mut self, arrival: u32, bursts: impl Into<String>, priority: u32) -> &ProcessRow {
        let id = self.allocate_id();
        self.rows.push(ProcessRow::new(id, arrival, bursts, priority));
        &self.rows[self.rows.len() - 1]
    }

    /// Append an existing row, generating an id if it has none
    pub fn push(&mut self, mut row: ProcessRow) {
        if row.id.trim().is_empty() {
            row.id = self.allocate_id();
        } else {
            self.reserve_id(&row.id);
        }
        self.rows.push(row);
    }

    /// Remove a row by id; its id is never handed out again
    pub fn remove_row(&mut self, id: &str) -> Option<ProcessRow> {
        let pos = self.rows.iter().position(|r| r.id == id)?;
        Some(self.rows.remove(pos))
    }

    pub fn rows(&self) -> &[ProcessRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Normalize every row for the given policy, skipping rows with no usable burst
    pub fn to_processes(&self, policy: PolicyKind, io_enabled: bool) -> Vec<Process> {
        self.rows
            .iter()
            .filter_map(|row| {
                let process = row.to_process(policy, io_enabled);
                if process.is_none() {
                    warn!("Skipping {}: no positive burst in '{}'", row.id, row.bursts);
                }
                process
            })
            .collect()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_burst_sequence_drops_invalid_entries() {
        assert_eq!(parse_burst_sequence("4, 2, 3"), vec![4, 2, 3]);
        assert_eq!(parse_burst_sequence(" 5 "), vec![5]);
        assert_eq!(parse_burst_sequence("4, x, 0, 3"), vec![4, 3]);
        assert!(parse_burst_sequence("").is_empty());
        assert!(parse_burst_sequence("-1, abc").is_empty());
    }

    #[test]
    fn test_default_table_ids() {
        let mut table = ProcessTable::with_defaults();
        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);

        assert_eq!(table.add_row(0, "5", 1).id, "P4");
        assert_eq!(table.add_row(0, "5", 1).id, "P5");
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut table = ProcessTable::with_defaults();
        table.add_row(3, "2", 1);

        let removed = table.remove_row("P4").unwrap();
        assert_eq!(removed.arrival, 3);
        assert!(table.remove_row("P4").is_none());

        assert_eq!(table.add_row(0, "1", 1).id, "P5");
    }

    #[test]
    fn test_round_robin_with_io_keeps_full_sequence() {
        let row = ProcessRow::new("P1", 0, "4, 2, 3", 1);

        let p = row.to_process(PolicyKind::RoundRobin, true).unwrap();
        assert_eq!(p.burst_sequence, vec![4, 2, 3]);
        assert_eq!(p.total_cpu_burst, 7);
        assert_eq!(p.remaining_burst, 4);
    }

    #[test]
    fn test_other_modes_use_first_burst_only() {
        let row = ProcessRow::new("P1", 2, "4, 2, 3", 5);

        for (policy, io) in [
            (PolicyKind::RoundRobin, false),
            (PolicyKind::Fcfs, true),
            (PolicyKind::Sjf, false),
            (PolicyKind::Priority, false),
        ] {
            let p = row.to_process(policy, io).unwrap();
            assert_eq!(p.burst_sequence, vec![4]);
            assert_eq!(p.total_cpu_burst, 4);
            assert_eq!(p.priority, 5);
            assert_eq!(p.arrival_time, 2);
        }
    }

    #[test]
    fn test_rows_without_bursts_are_skipped() {
        let mut table = ProcessTable::new();
        table.add_row(0, "3", 1);
        table.add_row(1, "abc", 1);
        table.add_row(2, "0, 4", 1);

        let rr_io = table.to_processes(PolicyKind::RoundRobin, true);
        let ids: Vec<&str> = rr_io.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);

        // First burst of P3 is zero, so it has nothing to run without I/O
        let fcfs = table.to_processes(PolicyKind::Fcfs, false);
        assert_eq!(fcfs.len(), 1);
    }

    #[test]
    fn test_parse_spec() {
        let row = ProcessRow::parse_spec("0:4,2,3").unwrap();
        assert_eq!(row.arrival, 0);
        assert_eq!(row.bursts, "4,2,3");
        assert_eq!(row.priority, DEFAULT_PRIORITY);
        assert!(row.id.is_empty());

        let row = ProcessRow::parse_spec(" 3 : 5 : 2 ").unwrap();
        assert_eq!(row.arrival, 3);
        assert_eq!(row.priority, 2);

        assert!(ProcessRow::parse_spec("x:5").is_err());
        assert!(ProcessRow::parse_spec("1").is_err());
        assert!(ProcessRow::parse_spec("1:5:1:9").is_err());
    }

    #[test]
    fn test_from_json_assigns_missing_ids() {
        let json = r#"[
            {"arrival": 0, "bursts": "5"},
            {"id": "Editor", "arrival": 1, "bursts": "2, 1, 2", "priority": 3},
            {"bursts": "4"}
        ]"#;

        let table = ProcessTable::from_json(json).unwrap();
        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "Editor", "P2"]);
        assert_eq!(table.rows()[2].arrival, 0);
        assert_eq!(table.rows()[0].priority, DEFAULT_PRIORITY);

        assert!(matches!(
            ProcessTable::from_json("{not json"),
            Err(SimError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generated_ids_skip_explicit_ones() {
        let json = r#"[
            {"id": "P1", "arrival": 0, "bursts": "3"},
            {"arrival": 1, "bursts": "2"},
            {"id": "P7", "arrival": 2, "bursts": "1"},
            {"bursts": "4"}
        ]"#;

        let mut table = ProcessTable::from_json(json).unwrap();
        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P7", "P8"]);
        assert_eq!(table.add_row(0, "1", 1).id, "P9");

        let processes = table.to_processes(PolicyKind::Fcfs, false);
        assert!(crate::simulator::simulate(&processes, PolicyKind::Fcfs, None).is_ok());
    }

    #[test]
    fn test_generated_ids_skip_non_numeric_matches() {
        let mut table = ProcessTable::new();
        table.push(ProcessRow::new("Editor", 0, "2", 1));
        table.push(ProcessRow::new("", 0, "2", 1));

        assert_eq!(table.rows()[1].id, "P1");
    }

    #[test]
    fn test_overflowing_cpu_total_is_reported() {
        let row = ProcessRow::new("P1", 0, "4000000000, 1, 4000000000", 1);

        let p = row.to_process(PolicyKind::RoundRobin, true).unwrap();
        assert_eq!(p.total_cpu_burst, u32::MAX);

        let result = crate::simulator::simulate(&[p], PolicyKind::RoundRobin, Some(2));
        assert!(matches!(result, Err(SimError::MalformedProcess { .. })));
    }
}
