//! Discrete-time CPU scheduling simulator
//!
//! One tick loop is shared by every policy. Each tick runs, in order:
//! I/O completions, arrivals, ready-queue admission, dispatch, snapshot
//! capture, execution, then completion/blocking/preemption of the running
//! process. The snapshot is taken before the tick's work, so it shows the
//! dispatch decision for the tick but not the burst it consumes.
//!
//! [`Simulation`] yields snapshots lazily; [`simulate`] drives it to the end
//! and collects a [`Trace`].

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SimError};
use crate::policies::{PolicyKind, SchedulingPolicy};
use crate::types::{BlockedEntry, Process, ProcessState, ProcessStatus, Snapshot, Trace};

/// Safety ceiling on the simulation clock
pub const MAX_TICKS: u32 = 1000;

fn default_tick_limit() -> u32 {
    MAX_TICKS
}

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub policy: PolicyKind,
    /// Required for Round Robin, ignored otherwise
    #[serde(default)]
    pub quantum: Option<u32>,
    #[serde(default = "default_tick_limit")]
    pub tick_limit: u32,
}

impl SimulationConfig {
    pub fn new(policy: PolicyKind, quantum: Option<u32>) -> Self {
        SimulationConfig {
            policy,
            quantum,
            tick_limit: MAX_TICKS,
        }
    }

    pub fn round_robin(quantum: u32) -> Self {
        Self::new(PolicyKind::RoundRobin, Some(quantum))
    }

    pub fn fcfs() -> Self {
        Self::new(PolicyKind::Fcfs, None)
    }

    pub fn sjf() -> Self {
        Self::new(PolicyKind::Sjf, None)
    }

    pub fn with_tick_limit(mut self, tick_limit: u32) -> Self {
        self.tick_limit = tick_limit;
        self
    }
}

/// Where a step-by-step simulation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    /// More snapshots to come
    Running,
    /// Final snapshot has been produced
    Finished,
    /// Tick ceiling passed before every process terminated
    Aborted { ticks: u32 },
}

/// A single simulation run, advanced one snapshot at a time
///
/// Works on a private copy of the input, sorted by arrival time. Process
/// indices used by the queues refer to that sorted copy.
pub struct Simulation {
    policy: Box<dyn SchedulingPolicy>,
    tick_limit: u32,

    processes: Vec<Process>,
    states: Vec<ProcessState>,

    // Queues
    not_arrived: VecDeque<usize>,
    ready: VecDeque<usize>,
    blocked: Vec<usize>,
    terminated: Vec<usize>,

    // CPU
    running: Option<usize>,
    quantum_remaining: u32,

    current_time: u32,
    status: SimulationStatus,
}

impl Simulation {
    /// Validate and copy the input, ready to produce the snapshot for tick 0
    pub fn new(processes: &[Process], config: &SimulationConfig) -> Result<Self> {
        let policy = config.policy.build(config.quantum)?;

        if processes.is_empty() {
            return Err(SimError::NoProcesses);
        }

        let mut seen = HashSet::new();
        for p in processes {
            p.validate()?;
            if !seen.insert(p.id.as_str()) {
                return Err(SimError::malformed(&p.id, "duplicate process id"));
            }
        }

        // Rebuild from the defining fields so runtime state always starts fresh
        let mut working: Vec<Process> = processes
            .iter()
            .map(|p| Process::new(p.id.clone(), p.arrival_time, p.burst_sequence.clone(), p.priority))
            .collect();
        if !policy.models_io() {
            working.iter_mut().for_each(Process::truncate_to_first_burst);
        }
        // Stable: equal arrivals keep caller order
        working.sort_by_key(|p| p.arrival_time);

        info!(
            "Simulation started: policy={}, processes={}, quantum={:?}",
            policy.name(),
            working.len(),
            policy.time_slice()
        );

        let count = working.len();
        Ok(Simulation {
            policy,
            tick_limit: config.tick_limit,
            processes: working,
            states: vec![ProcessState::NotArrived; count],
            not_arrived: (0..count).collect(),
            ready: VecDeque::new(),
            blocked: Vec::new(),
            terminated: Vec::new(),
            running: None,
            quantum_remaining: 0,
            current_time: 0,
            status: SimulationStatus::Running,
        })
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn current_time(&self) -> u32 {
        self.current_time
    }

    /// Working copy of the process table, in arrival order
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Produce the next snapshot, or `None` once finished or aborted
    pub fn step(&mut self) -> Option<Snapshot> {
        if self.status != SimulationStatus::Running {
            return None;
        }

        if self.terminated.len() == self.processes.len() {
            self.status = SimulationStatus::Finished;
            info!(
                "Simulation finished: policy={}, ticks={}",
                self.policy.name(),
                self.current_time
            );
            return Some(self.final_snapshot());
        }

        if self.current_time > self.tick_limit {
            warn!(
                "Simulation stopped after {} ticks: {} of {} processes terminated",
                self.current_time,
                self.terminated.len(),
                self.processes.len()
            );
            self.status = SimulationStatus::Aborted {
                ticks: self.current_time,
            };
            return None;
        }

        Some(self.tick())
    }

    /// Run one clock tick and return its snapshot
    fn tick(&mut self) -> Snapshot {
        let time = self.current_time;

        // I/O completions join the ready queue ahead of new arrivals
        let returning = if self.policy.models_io() {
            self.release_finished_io(time)
        } else {
            Vec::new()
        };
        let arrivals = self.collect_arrivals(time);

        for &idx in returning.iter().chain(arrivals.iter()) {
            self.states[idx] = ProcessState::Ready;
            self.ready.push_back(idx);
        }

        if self.running.is_none() {
            self.dispatch(time);
        }

        let snapshot = self.capture(time, &arrivals);
        trace!("t={} cpu={} ready={:?}", time, snapshot.cpu_label(), snapshot.ready_queue);

        self.execute();
        if self.policy.models_io() {
            self.finish_trailing_io(time);
        }
        self.resolve_running(time);

        self.current_time += 1;
        snapshot
    }

    /// Move blocked processes whose I/O wait has run out back towards the CPU
    fn release_finished_io(&mut self, time: u32) -> Vec<usize> {
        let (done, waiting): (Vec<usize>, Vec<usize>) = self
            .blocked
            .iter()
            .partition(|&&idx| self.processes[idx].io_timer == 0);
        self.blocked = waiting;

        for &idx in &done {
            let process = &mut self.processes[idx];
            let burst = process.advance_phase();
            debug!("t={} {} finished I/O, next CPU burst {}", time, process.id, burst);
        }
        done
    }

    /// Terminate blocked processes whose sequence ends on the I/O phase just completed
    fn finish_trailing_io(&mut self, time: u32) {
        let (done, waiting): (Vec<usize>, Vec<usize>) = self.blocked.iter().partition(|&&idx| {
            let process = &self.processes[idx];
            process.io_timer == 0 && !process.has_next_phase()
        });
        self.blocked = waiting;

        for idx in done {
            let process = &mut self.processes[idx];
            process.finish(time + 1);
            debug!("t={} {} terminated after final I/O", time, process.id);
            self.states[idx] = ProcessState::Terminated;
            self.terminated.push(idx);
        }
    }

    /// Pop every process arriving exactly at `time`
    fn collect_arrivals(&mut self, time: u32) -> Vec<usize> {
        let mut arrivals = Vec::new();
        while let Some(&idx) = self.not_arrived.front() {
            if self.processes[idx].arrival_time != time {
                break;
            }
            self.not_arrived.pop_front();
            debug!("t={} {} arrived", time, self.processes[idx].id);
            arrivals.push(idx);
        }
        arrivals
    }

    fn dispatch(&mut self, time: u32) {
        let Some(idx) = self
            .policy
            .select_next(&mut self.ready, &self.processes, time)
        else {
            return;
        };

        self.running = Some(idx);
        self.states[idx] = ProcessState::Running;
        self.quantum_remaining = self.policy.time_slice().unwrap_or(0);
        debug!(
            "t={} dispatch {} (remaining burst {})",
            time, self.processes[idx].id, self.processes[idx].remaining_burst
        );
    }

    /// One tick of work for the running process and every blocked process
    fn execute(&mut self) {
        if let Some(idx) = self.running {
            let process = &mut self.processes[idx];
            process.remaining_burst = process.remaining_burst.saturating_sub(1);
            if self.policy.time_slice().is_some() {
                self.quantum_remaining = self.quantum_remaining.saturating_sub(1);
            }
        }

        for &idx in &self.blocked {
            let process = &mut self.processes[idx];
            process.io_timer = process.io_timer.saturating_sub(1);
            process.remaining_burst = process.io_timer;
        }
    }

    /// Terminate, block or preempt the running process (first match wins)
    fn resolve_running(&mut self, time: u32) {
        let Some(idx) = self.running else {
            return;
        };
        let process = &mut self.processes[idx];

        if process.remaining_burst == 0 {
            if self.policy.models_io() && process.has_next_phase() {
                let io = process.advance_phase();
                process.io_timer = io;
                debug!("t={} {} blocked for {} ticks of I/O", time, process.id, io);
                self.states[idx] = ProcessState::Blocked;
                self.blocked.push(idx);
            } else {
                process.finish(time + 1);
                debug!(
                    "t={} {} terminated (completion {})",
                    time, process.id, process.completion_time
                );
                self.states[idx] = ProcessState::Terminated;
                self.terminated.push(idx);
            }
            self.release_cpu();
        } else if self.policy.time_slice().is_some() && self.quantum_remaining == 0 {
            debug!(
                "t={} {} preempted ({} remaining)",
                time, process.id, process.remaining_burst
            );
            self.states[idx] = ProcessState::Ready;
            self.ready.push_back(idx);
            self.release_cpu();
        }
    }

    fn release_cpu(&mut self) {
        self.running = None;
        self.quantum_remaining = 0;
    }

    fn ids(&self, indices: impl IntoIterator<Item = usize>) -> Vec<String> {
        indices
            .into_iter()
            .map(|idx| self.processes[idx].id.clone())
            .collect()
    }

    fn quantum_field(&self) -> Option<u32> {
        self.policy.time_slice().map(|_| self.quantum_remaining)
    }

    fn capture(&self, time: u32, arrivals: &[usize]) -> Snapshot {
        Snapshot {
            time,
            cpu_occupant: self.running.map(|idx| self.processes[idx].id.clone()),
            quantum_remaining: self.quantum_field(),
            ready_queue: self.ids(self.ready.iter().copied()),
            blocked_queue: self
                .blocked
                .iter()
                .map(|&idx| BlockedEntry {
                    id: self.processes[idx].id.clone(),
                    io_remaining: self.processes[idx].io_timer,
                })
                .collect(),
            terminated: self.ids(self.terminated.iter().copied()),
            arrivals: self.ids(arrivals.iter().copied()),
            process_states: self.process_states(),
            is_final: false,
            final_stats: None,
        }
    }

    fn process_states(&self) -> Vec<ProcessStatus> {
        self.processes
            .iter()
            .zip(&self.states)
            .map(|(p, &state)| ProcessStatus {
                id: p.id.clone(),
                state,
                remaining_burst: p.remaining_burst,
            })
            .collect()
    }

    fn final_snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.current_time,
            cpu_occupant: None,
            quantum_remaining: self.policy.time_slice().map(|_| 0),
            ready_queue: Vec::new(),
            blocked_queue: Vec::new(),
            terminated: self.ids(self.terminated.iter().copied()),
            arrivals: Vec::new(),
            process_states: self.process_states(),
            is_final: true,
            final_stats: Some(self.processes.clone()),
        }
    }
}

impl Iterator for Simulation {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        self.step()
    }
}

/// Run a simulation to completion with the default tick ceiling
pub fn simulate(processes: &[Process], policy: PolicyKind, quantum: Option<u32>) -> Result<Trace> {
    simulate_with(processes, &SimulationConfig::new(policy, quantum))
}

/// Run a simulation to completion
///
/// Returns [`SimError::TickLimitExceeded`] carrying the partial trace if the
/// clock passes `config.tick_limit` first.
pub fn simulate_with(processes: &[Process], config: &SimulationConfig) -> Result<Trace> {
    let mut simulation = Simulation::new(processes, config)?;
    let mut trace = Trace::new(simulation.policy_name());

    for snapshot in simulation.by_ref() {
        trace.push(snapshot);
    }

    match simulation.status() {
        SimulationStatus::Finished => Ok(trace),
        _ => Err(SimError::TickLimitExceeded {
            limit: config.tick_limit,
            partial: Box::new(trace),
        }),
    }
}
