//! CPU Scheduling Simulation Engine
//!
//! Discrete-time simulator that replays a scheduling policy over a process set
//! and records a snapshot of the system at every tick.
//!
//! ```no_run
//! use cpusched_simulation_engine::{simulate, PolicyKind, Process};
//!
//! let processes = vec![Process::cpu_only("P1", 0, 5), Process::cpu_only("P2", 1, 3)];
//! let trace = simulate(&processes, PolicyKind::RoundRobin, Some(2))?;
//! for snapshot in &trace {
//!     println!("t={} cpu={}", snapshot.time, snapshot.cpu_label());
//! }
//! # Ok::<(), cpusched_simulation_engine::SimError>(())
//! ```

pub mod error;
pub mod input;
pub mod policies;
pub mod simulator;
pub mod stats;
pub mod timeline;
pub mod types;
pub mod workload;

pub use error::{Result, SimError};
pub use input::{ProcessRow, ProcessTable};
pub use policies::{PolicyKind, SchedulingPolicy};
pub use simulator::{MAX_TICKS, Simulation, SimulationConfig, SimulationStatus, simulate, simulate_with};
pub use stats::{SimulationReport, format_avg};
pub use timeline::Timeline;
pub use types::{BlockedEntry, Process, ProcessState, Snapshot, Trace};
pub use workload::WorkloadGenerator;
