//! Loopscope runtime
//!
//! A deterministic, steppable event-loop simulator for a small
//! JavaScript-like language. Feed it a script and drive it one unit of
//! work at a time; every step yields a snapshot of the call stack, the
//! micro/macrotask queues, and the console output so far.
//!
//! ```
//! use loopscope_runtime::Simulator;
//!
//! let mut sim = Simulator::new("console.log('Start');");
//! sim.start();
//! let snapshot = sim.step();
//! assert_eq!(snapshot.console_output, vec!["Start"]);
//! assert!(snapshot.finished);
//! ```

pub mod ast;
pub mod console;
pub mod diagnostic;
pub mod engine;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod promise;
pub mod snapshot;
pub mod span;
pub mod stack;
pub mod tasks;
pub mod timers;
pub mod token;
pub mod value;

pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use engine::Simulator;
pub use snapshot::{ActiveSubsystem, Snapshot};
pub use stack::StackFrame;
pub use tasks::{Task, TaskKind};
pub use value::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
