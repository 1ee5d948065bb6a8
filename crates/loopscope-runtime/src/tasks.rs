//! Task registry
//!
//! Two ordered task collections, microtasks and macrotasks, tracking
//! deferred work that has been scheduled but has not started executing.
//! Insertion order is both display order and processing order.
//!
//! Removal is identity-keyed: each scheduling site records the `TaskId` it
//! created and removes exactly that entry when the unit of work runs, so
//! concurrent tasks with identical labels can never remove each other's
//! entries.

use serde::{Deserialize, Serialize};

/// Unique task identifier (monotonically increasing per registry)
pub type TaskId = u64;

/// Which queue a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Promise-reaction work
    Micro,
    /// Timer-scheduled work
    Macro,
}

/// A deferred unit of work awaiting execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id
    pub id: TaskId,
    /// Display label ("setTimeout (500ms)", "Promise.then", ...)
    pub label: String,
    /// Queue membership
    pub kind: TaskKind,
    /// Short source snippet shown on the task card
    pub source_text: String,
}

/// Ordered micro/macro task collections
#[derive(Debug, Default)]
pub struct TaskRegistry {
    micro: Vec<Task>,
    macro_tasks: Vec<Task>,
    next_id: TaskId,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            micro: Vec::new(),
            macro_tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a task to the back of its queue and return its id
    pub fn enqueue(
        &mut self,
        kind: TaskKind,
        label: impl Into<String>,
        source_text: impl Into<String>,
    ) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;

        let task = Task {
            id,
            label: label.into(),
            kind,
            source_text: source_text.into(),
        };
        match kind {
            TaskKind::Micro => self.micro.push(task),
            TaskKind::Macro => self.macro_tasks.push(task),
        }
        id
    }

    /// Remove a task by identity. Returns false if no such task exists
    /// (already removed, or never enqueued).
    pub fn remove(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.micro.iter().position(|t| t.id == id) {
            self.micro.remove(pos);
            return true;
        }
        if let Some(pos) = self.macro_tasks.iter().position(|t| t.id == id) {
            self.macro_tasks.remove(pos);
            return true;
        }
        false
    }

    /// Number of tasks in one queue
    pub fn len(&self, kind: TaskKind) -> usize {
        match kind {
            TaskKind::Micro => self.micro.len(),
            TaskKind::Macro => self.macro_tasks.len(),
        }
    }

    /// Total queued tasks across both queues
    pub fn total(&self) -> usize {
        self.micro.len() + self.macro_tasks.len()
    }

    /// True when both queues are empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Microtasks in queue order
    pub fn micro(&self) -> &[Task] {
        &self.micro
    }

    /// Macrotasks in queue order
    pub fn macro_tasks(&self) -> &[Task] {
        &self.macro_tasks
    }

    /// Clear everything (id allocation restarts too)
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
