//! CPU occupancy timeline (Gantt chart data) derived from a trace

use serde::{Deserialize, Serialize};

use crate::types::Trace;

/// Consecutive ticks with the same CPU occupant, `end` exclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// `None` while the CPU is idle
    pub occupant: Option<String>,
    pub start: u32,
    pub end: u32,
}

impl Segment {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn label(&self) -> &str {
        self.occupant.as_deref().unwrap_or("Idle")
    }
}

/// Ordered CPU occupancy segments covering every simulated tick
///
/// A process that is preempted and immediately re-dispatched stays in one
/// segment, since the CPU never changed hands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<Segment>,
}

impl Timeline {
    pub fn from_trace(trace: &Trace) -> Self {
        let mut segments: Vec<Segment> = Vec::new();

        for snapshot in trace.iter().filter(|s| !s.is_final) {
            match segments.last_mut() {
                Some(last) if last.occupant == snapshot.cpu_occupant && last.end == snapshot.time => {
                    last.end += 1;
                }
                _ => segments.push(Segment {
                    occupant: snapshot.cpu_occupant.clone(),
                    start: snapshot.time,
                    end: snapshot.time + 1,
                }),
            }
        }

        Timeline { segments }
    }

    /// Occupant at `time`, `None` for idle or out-of-range ticks
    pub fn occupant_at(&self, time: u32) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.start <= time && time < s.end)
            .and_then(|s| s.occupant.as_deref())
    }

    /// Total ticks the CPU spent running `id`
    pub fn busy_ticks(&self, id: &str) -> u32 {
        self.segments
            .iter()
            .filter(|s| s.occupant.as_deref() == Some(id))
            .map(Segment::len)
            .sum()
    }

    pub fn idle_ticks(&self) -> u32 {
        self.segments
            .iter()
            .filter(|s| s.occupant.is_none())
            .map(Segment::len)
            .sum()
    }

    /// Number of ticks covered
    pub fn span(&self) -> u32 {
        self.segments.last().map(|s| s.end).unwrap_or(0)
    }
}
