//! CPU Scheduling Simulator CLI
//!
//! Runs one or more scheduling policies over the same process set and prints
//! the per-process results, averages and a CPU timeline for each.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cpusched_simulation_engine::{
    PolicyKind, ProcessRow, ProcessTable, SimError, SimulationConfig, SimulationReport, Snapshot,
    Timeline, Trace, WorkloadGenerator, format_avg, simulate_with,
};

#[derive(Parser, Debug)]
#[command(name = "cpusched-sim")]
#[command(about = "Simulate CPU scheduling policies tick by tick", long_about = None)]
struct Args {
    /// Policies to run (comma-separated: rr,fcfs,sjf,priority, or all)
    #[arg(short, long, value_delimiter = ',', default_value = "rr,fcfs,sjf")]
    policies: Vec<String>,

    /// Round Robin time quantum (ticks)
    #[arg(short, long, default_value_t = 2)]
    quantum: u32,

    /// Model I/O phases (Round Robin only)
    #[arg(long)]
    io: bool,

    /// JSON file with an array of process rows
    #[arg(short, long, conflicts_with_all = ["process", "random"])]
    input: Option<PathBuf>,

    /// Process as "arrival:bursts[:priority]", e.g. "0:4,2,3" (repeatable)
    #[arg(long = "process", conflicts_with = "random")]
    process: Vec<String>,

    /// Generate this many random processes
    #[arg(long)]
    random: Option<usize>,

    /// Seed for --random
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Abort a run after this many ticks
    #[arg(long, default_value_t = cpusched_simulation_engine::MAX_TICKS)]
    tick_limit: u32,

    /// Print every snapshot
    #[arg(long)]
    trace: bool,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One policy run as written to `--output`
#[derive(Serialize)]
struct RunOutput {
    config: SimulationConfig,
    completed: bool,
    report: Option<SimulationReport>,
    timeline: Timeline,
    trace: Trace,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cpusched_sim=info,cpusched_simulation_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let table = load_table(&args)?;
    info!("Loaded {} process rows", table.len());

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  CPU Scheduling Simulator                                ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Processes:");
    println!("{:<8} {:>8} {:>10}  {}", "ID", "Arrival", "Priority", "Bursts");
    for row in table.rows() {
        println!("{:<8} {:>8} {:>10}  {}", row.id, row.arrival, row.priority, row.bursts);
    }
    println!();

    let mut kinds = Vec::new();
    for name in &args.policies {
        match PolicyKind::parse_selection(name) {
            Ok(selected) => kinds.extend(selected),
            Err(e) => eprintln!("{}", e),
        }
    }

    let mut runs = Vec::new();
    for kind in kinds {
        let processes = table.to_processes(kind, args.io);
        let quantum = kind.uses_quantum().then_some(args.quantum);
        let config = SimulationConfig::new(kind, quantum).with_tick_limit(args.tick_limit);

        let (trace, completed) = match simulate_with(&processes, &config) {
            Ok(trace) => (trace, true),
            Err(e @ SimError::NotImplemented(_)) => {
                eprintln!("{}", e);
                continue;
            }
            Err(SimError::TickLimitExceeded { limit, partial }) => {
                warn!("{} aborted after {} ticks", kind, limit);
                (*partial, false)
            }
            Err(e) => return Err(e).with_context(|| format!("{} simulation failed", kind)),
        };

        print_run(&config, &trace, args.trace);

        runs.push(RunOutput {
            report: SimulationReport::from_trace(&trace),
            timeline: Timeline::from_trace(&trace),
            config,
            completed,
            trace,
        });
    }

    if runs.len() > 1 {
        print_comparison(&runs);
    }

    if let Some(path) = &args.output {
        println!("\nWriting results to {}...", path.display());
        let json = serde_json::to_string_pretty(&runs)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  Results saved");
    }

    Ok(())
}

fn load_table(args: &Args) -> Result<ProcessTable> {
    if let Some(path) = &args.input {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(ProcessTable::from_json(&json)?);
    }

    if !args.process.is_empty() {
        let mut table = ProcessTable::new();
        for spec in &args.process {
            table.push(ProcessRow::parse_spec(spec)?);
        }
        return Ok(table);
    }

    if let Some(count) = args.random {
        info!("Generating {} random processes (seed {})", count, args.seed);
        return Ok(WorkloadGenerator::new(args.seed).generate(count, args.io)?);
    }

    Ok(ProcessTable::with_defaults())
}

fn print_run(config: &SimulationConfig, trace: &Trace, show_trace: bool) {
    println!("── {} ──", trace.policy_name);
    if let Some(q) = config.quantum {
        println!("Quantum: {}", q);
    }

    if show_trace {
        for snapshot in trace.iter().filter(|s| !s.is_final) {
            println!("{}", snapshot_line(snapshot));
        }
        println!();
    }

    let timeline = Timeline::from_trace(trace);
    let gantt: Vec<String> = timeline
        .segments
        .iter()
        .map(|s| format!("{} [{}-{})", s.label(), s.start, s.end))
        .collect();
    println!("Timeline: {}", gantt.join(" | "));

    let Some(report) = SimulationReport::from_trace(trace) else {
        println!("Incomplete: tick limit reached at t={}\n", trace.len().saturating_sub(1));
        return;
    };

    println!(
        "{:<8} {:>8} {:>8} {:>11} {:>11} {:>8}",
        "ID", "Arrival", "Burst", "Completion", "Turnaround", "Waiting"
    );
    println!("{}", "-".repeat(59));
    for row in &report.rows {
        println!(
            "{:<8} {:>8} {:>8} {:>11} {:>11} {:>8}",
            row.id, row.arrival, row.total_burst, row.completion, row.turnaround, row.waiting
        );
    }
    println!("Average turnaround: {}", format_avg(report.avg_turnaround));
    println!("Average waiting:    {}", format_avg(report.avg_waiting));
    println!("CPU utilization:    {:.1}%\n", report.cpu_utilization * 100.0);
}

fn snapshot_line(snapshot: &Snapshot) -> String {
    let quantum = snapshot
        .quantum_remaining
        .map(|q| format!(" q={}", q))
        .unwrap_or_default();
    let blocked: Vec<String> = snapshot.blocked_queue.iter().map(ToString::to_string).collect();

    format!(
        "t={:<4} cpu={:<6}{} ready=[{}] blocked=[{}] done=[{}]",
        snapshot.time,
        snapshot.cpu_label(),
        quantum,
        snapshot.ready_queue.join(", "),
        blocked.join(", "),
        snapshot.terminated.join(", "),
    )
}

fn print_comparison(runs: &[RunOutput]) {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Policy Comparison                                       ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!(
        "{:<12} {:>15} {:>12} {:>10} {:>12}",
        "Policy", "Avg Turnaround", "Avg Waiting", "Makespan", "Utilization"
    );
    println!("{}", "-".repeat(65));

    for run in runs {
        match &run.report {
            Some(report) => println!(
                "{:<12} {:>15} {:>12} {:>10} {:>11.1}%",
                report.policy_name,
                format_avg(report.avg_turnaround),
                format_avg(report.avg_waiting),
                report.makespan,
                report.cpu_utilization * 100.0,
            ),
            None => println!("{:<12} {:>15}", run.trace.policy_name, "aborted"),
        }
    }
}
