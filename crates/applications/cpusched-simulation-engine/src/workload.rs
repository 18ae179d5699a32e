//! Synthetic process workloads
//!
//! Generates reproducible process tables from a seed:
//! - Exponential inter-arrival gaps (Poisson arrivals), floored to whole ticks
//! - Uniform CPU and I/O burst lengths
//! - Optional alternating CPU/I-O sequences ending on a CPU burst

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::error::{Result, SimError};
use crate::input::ProcessTable;

/// Seeded generator for process tables
pub struct WorkloadGenerator {
    rng: StdRng,
    mean_interarrival: f64,
    max_cpu_burst: u32,
    max_io_burst: u32,
    max_cpu_phases: u32,
    max_priority: u32,
}

impl WorkloadGenerator {
    /// Create a generator with default shape parameters
    ///
    /// # Arguments
    /// * `seed` - Same seed, same workload
    pub fn new(seed: u64) -> Self {
        WorkloadGenerator {
            rng: StdRng::seed_from_u64(seed),
            mean_interarrival: 2.0,
            max_cpu_burst: 8,
            max_io_burst: 4,
            max_cpu_phases: 3,
            max_priority: 5,
        }
    }

    /// Mean gap between arrivals, in ticks
    pub fn with_mean_interarrival(mut self, mean: f64) -> Self {
        self.mean_interarrival = mean;
        self
    }

    pub fn with_max_cpu_burst(mut self, max: u32) -> Self {
        self.max_cpu_burst = max.max(1);
        self
    }

    pub fn with_max_io_burst(mut self, max: u32) -> Self {
        self.max_io_burst = max.max(1);
        self
    }

    /// Upper bound on CPU phases per process when I/O is enabled
    pub fn with_max_cpu_phases(mut self, max: u32) -> Self {
        self.max_cpu_phases = max.max(1);
        self
    }

    /// Generate `count` rows with ids `P1..Pn`
    ///
    /// Without I/O every row has a single CPU burst.
    pub fn generate(&mut self, count: usize, io_enabled: bool) -> Result<ProcessTable> {
        if self.mean_interarrival.is_nan() || self.mean_interarrival <= 0.0 {
            return Err(SimError::invalid_input(format!(
                "mean inter-arrival must be > 0, got {}",
                self.mean_interarrival
            )));
        }
        let gaps = Exp::new(1.0 / self.mean_interarrival)
            .map_err(|e| SimError::invalid_input(format!("inter-arrival distribution: {}", e)))?;

        let mut table = ProcessTable::new();
        let mut arrival = 0u32;

        for i in 0..count {
            if i > 0 {
                // dX ~ Exp(λ), floored to ticks
                let gap: f64 = gaps.sample(&mut self.rng);
                arrival = arrival.saturating_add(gap.floor() as u32);
            }

            let phases = if io_enabled {
                self.rng.gen_range(1..=self.max_cpu_phases)
            } else {
                1
            };

            let mut bursts = Vec::with_capacity(phases as usize * 2);
            for phase in 0..phases {
                if phase > 0 {
                    bursts.push(self.rng.gen_range(1..=self.max_io_burst));
                }
                bursts.push(self.rng.gen_range(1..=self.max_cpu_burst));
            }

            let text = bursts
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let priority = self.rng.gen_range(1..=self.max_priority);

            table.add_row(arrival, text, priority);
        }

        Ok(table)
    }

    /// Generate a simple table (deterministic, for testing)
    ///
    /// One process per tick, all with the same CPU burst.
    pub fn generate_simple(count: usize, burst: u32) -> ProcessTable {
        let mut table = ProcessTable::new();
        for i in 0..count {
            table.add_row(i as u32, burst.to_string(), 1);
        }
        table
    }
}
