//! Execution snapshots
//!
//! Immutable projection of the simulator's state, taken after every step.
//! Snapshots own their data (no borrows into the engine), so a caller can
//! hold a trace of them, diff consecutive ones, or serialize them.

use crate::stack::StackFrame;
use crate::tasks::Task;
use serde::{Deserialize, Serialize};

/// Which part of the model the most recent step ran in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveSubsystem {
    /// Synchronous call-stack execution
    Stack,
    /// A microtask (promise reaction) is running
    Micro,
    /// A macrotask (timer callback) is running
    Macro,
    /// Nothing is running
    #[default]
    None,
}

/// Full simulator state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Live call stack, bottom-to-top
    pub call_stack: Vec<StackFrame>,
    /// Completed frames, oldest first
    pub call_stack_history: Vec<StackFrame>,
    /// Queued microtasks, front first
    pub micro_tasks: Vec<Task>,
    /// Queued macrotasks, front first
    pub macro_tasks: Vec<Task>,
    /// Line of the topmost live frame (0 when the stack is empty)
    pub current_line: u32,
    /// True between a successful start and completion
    pub running: bool,
    /// True once all work has drained
    pub finished: bool,
    /// Subsystem the latest step executed in
    pub active: ActiveSubsystem,
    /// Console output so far, oldest line first
    pub console_output: Vec<String>,
}

impl Snapshot {
    /// Snapshot of a simulator that has not started
    pub fn idle() -> Self {
        Snapshot {
            call_stack: Vec::new(),
            call_stack_history: Vec::new(),
            micro_tasks: Vec::new(),
            macro_tasks: Vec::new(),
            current_line: 0,
            running: false,
            finished: false,
            active: ActiveSubsystem::None,
            console_output: Vec::new(),
        }
    }

    /// True when no work remains anywhere in the model
    pub fn is_drained(&self) -> bool {
        self.call_stack.is_empty() && self.micro_tasks.is_empty() && self.macro_tasks.is_empty()
    }
}
