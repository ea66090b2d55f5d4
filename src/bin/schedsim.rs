//! schedsim - Run scheduling simulations from JSON workloads.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use sched_sim::{ExitKind, PolicyKind, Scenario, SimFormat, Simulator, Tick, Trace, TraceKind};

/// Run scheduling simulations from JSON workloads.
#[derive(Parser)]
#[command(name = "schedsim")]
struct Cli {
    /// Path to a JSON workload file.
    workload: Option<PathBuf>,

    /// Scheduling policy (see --list-policies).
    #[arg(short, long, env = "SCHEDSIM_POLICY", default_value = "fifo")]
    policy: String,

    /// Stop after this many ticks (overrides the workload's max_ticks).
    #[arg(long, value_name = "TICKS")]
    max_ticks: Option<Tick>,

    /// Print trace events to stderr.
    #[arg(long)]
    dump_trace: bool,

    /// Only print the per-process summary.
    #[arg(short, long)]
    quiet: bool,

    /// List available policies and exit.
    #[arg(long)]
    list_policies: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    if cli.list_policies {
        list_policies();
        return Ok(());
    }

    let policy = PolicyKind::from_name(&cli.policy)
        .context("use --list-policies to see available policies")?;
    let Some(path) = &cli.workload else {
        bail!("missing required argument: <WORKLOAD>");
    };
    let mut scenario = Scenario::from_file(path)
        .with_context(|| format!("failed to load workload {}", path.display()))?;
    if let Some(max_ticks) = cli.max_ticks {
        scenario.max_ticks = max_ticks;
    }

    let trace = Simulator::new(policy.build())
        .run(&scenario)
        .with_context(|| format!("failed to start policy {policy}"))?;

    if cli.dump_trace {
        trace.dump();
    }
    if !cli.quiet {
        print_timeline(&trace);
    }
    print_summary(&scenario, &trace);

    match trace.exit_kind() {
        ExitKind::Fault(msg) => bail!("{} broke a scheduling invariant: {msg}", trace.policy()),
        ExitKind::TickLimit => {
            eprintln!("stopped at the tick limit ({} ticks)", scenario.max_ticks);
            Ok(())
        }
        ExitKind::Normal => Ok(()),
    }
}

fn print_timeline(trace: &Trace) {
    println!("{}", trace.policy());
    for event in trace.events() {
        match event.kind {
            TraceKind::Ran { pid, priority } => {
                println!("{:>6}  pid {:<4} prio {}", event.tick, pid.0, priority)
            }
            TraceKind::Idle => println!("{:>6}  idle", event.tick),
            _ => {}
        }
    }
}

fn print_summary(scenario: &Scenario, trace: &Trace) {
    let opt = |t: Option<Tick>| t.map_or_else(|| "-".to_string(), |t| t.to_string());
    println!(
        "{:<16} {:>5} {:>8} {:>6} {:>6} {:>6}",
        "name", "pid", "arrival", "first", "done", "ran"
    );
    for def in &scenario.processes {
        println!(
            "{:<16} {:>5} {:>8} {:>6} {:>6} {:>6}",
            def.name,
            def.pid.0,
            def.arrival,
            opt(trace.first_run(def.pid)),
            opt(trace.exit_tick(def.pid)),
            trace.runtime(def.pid)
        );
    }
}

fn list_policies() {
    for kind in PolicyKind::ALL {
        println!("{:<6} {}", kind.short_name(), kind.build().name());
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .event_format(SimFormat)
        .try_init();
}
