//! loopscope command-line interface
//!
//! Drives the simulator over a script file: steps the event loop to
//! completion, optionally printing a per-step trace, and prints the
//! script's console output (or the final snapshot as JSON).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loopscope_runtime::{ActiveSubsystem, Simulator, Snapshot};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Built-in sample exercising the console, a timer, and a promise chain
const SAMPLE: &str = "\
console.log('Start');

setTimeout(() => {
  console.log('Timeout callback');
}, 500);

Promise.resolve().then(() => {
  console.log('Promise resolved');
});

console.log('End');
";

#[derive(Parser)]
#[command(
    name = "loopscope",
    version,
    about = "Steppable event-loop simulator for a JavaScript subset"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script to completion and print its console output
    Run {
        /// Script file to execute
        file: PathBuf,

        /// Print a per-step trace of the stack and task queues to stderr
        #[arg(long)]
        trace: bool,

        /// Print the final snapshot as JSON instead of console output
        #[arg(long)]
        json: bool,

        /// Give up after this many steps
        #[arg(long, default_value_t = 10_000)]
        max_steps: usize,
    },
    /// Print the built-in sample script
    Sample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            trace,
            json,
            max_steps,
        } => run(&file, trace, json, max_steps),
        Command::Sample => {
            print!("{}", SAMPLE);
            Ok(())
        }
    }
}

fn run(file: &PathBuf, trace: bool, json: bool, max_steps: usize) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut sim = Simulator::new(source);
    let mut snapshot = sim.start();
    if trace {
        print_step(0, &snapshot);
    }

    let mut steps = 0;
    while !snapshot.finished {
        steps += 1;
        if steps > max_steps {
            sim.cleanup();
            bail!("script did not finish within {} steps", max_steps);
        }
        snapshot = sim.step();
        if trace {
            print_step(steps, &snapshot);
        }
        // Nothing eligible yet: a timer is still counting down.
        if !snapshot.finished && sim.pending_timers() > 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }
    sim.cleanup();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for line in &snapshot.console_output {
            println!("{}", line);
        }
    }
    Ok(())
}

fn print_step(step: usize, snapshot: &Snapshot) {
    let active = match snapshot.active {
        ActiveSubsystem::Stack => "stack",
        ActiveSubsystem::Micro => "micro",
        ActiveSubsystem::Macro => "macro",
        ActiveSubsystem::None => "idle",
    };
    let labels = |tasks: &[loopscope_runtime::Task]| {
        tasks
            .iter()
            .map(|t| t.label.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };
    eprintln!(
        "step {:>3} [{active}] line {} | stack depth {} | micro: [{}] | macro: [{}]",
        step,
        snapshot.current_line,
        snapshot.call_stack.len(),
        labels(&snapshot.micro_tasks),
        labels(&snapshot.macro_tasks),
    );
}
