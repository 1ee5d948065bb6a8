//! Call-stack tracker
//!
//! Maintains the live call stack (a strict LIFO) plus an append-only
//! history of completed frames. Frames are created on entry to any
//! instrumented unit of work (the root pass, a deferred-callback body, a
//! promise executor, a reaction handler, or a console call) and popped on
//! exit. A popped frame is never mutated again except for its `active`
//! flag, which is cleared on the copy that goes into history.

use serde::{Deserialize, Serialize};

/// Unique frame identifier (monotonically increasing per tracker)
pub type FrameId = u64;

/// Sentinel line reported when the stack is empty
pub const NO_LINE: u32 = 0;

/// One unit of work on the call stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Unique id
    pub id: FrameId,
    /// Human-readable label ("setTimeout callback", "console.log", ...)
    pub name: String,
    /// 1-based source line the frame is attributed to
    pub line: u32,
    /// Short source snippet shown on the frame card
    pub code_snippet: String,
    /// True while the frame is on the live stack
    pub active: bool,
}

/// Live stack plus completed-frame history
#[derive(Debug, Default)]
pub struct StackTracker {
    frames: Vec<StackFrame>,
    history: Vec<StackFrame>,
    next_id: FrameId,
    current_line: u32,
}

impl StackTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            history: Vec::new(),
            next_id: 1,
            current_line: NO_LINE,
        }
    }

    /// Push a frame for a unit of work that is starting
    pub fn push(
        &mut self,
        name: impl Into<String>,
        snippet: impl Into<String>,
        line: u32,
    ) -> FrameId {
        let id = self.next_id;
        self.next_id += 1;

        self.frames.push(StackFrame {
            id,
            name: name.into(),
            line,
            code_snippet: snippet.into(),
            active: true,
        });
        self.current_line = line;
        id
    }

    /// Pop the topmost frame; no-op (None) on an empty stack.
    ///
    /// The popped frame is copied into history with `active` cleared, and
    /// `current_line` is recomputed from the new top.
    pub fn pop(&mut self) -> Option<StackFrame> {
        let frame = self.frames.pop()?;

        let mut historical = frame.clone();
        historical.active = false;
        self.history.push(historical);

        self.current_line = self.frames.last().map(|f| f.line).unwrap_or(NO_LINE);
        Some(frame)
    }

    /// Current stack depth
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Line of the topmost live frame, or `NO_LINE` when empty
    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    /// Live frames, bottom-to-top
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Completed frames, oldest first
    pub fn history(&self) -> &[StackFrame] {
        &self.history
    }

    /// Clear everything (id allocation restarts too)
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_pop_lifo() {
        let mut tracker = StackTracker::new();
        let a = tracker.push("outer", "outer()", 1);
        let b = tracker.push("inner", "inner()", 2);

        assert_eq!(tracker.depth(), 2);
        assert_eq!(tracker.current_line(), 2);

        let popped = tracker.pop().unwrap();
        assert_eq!(popped.id, b);
        assert_eq!(tracker.current_line(), 1);

        let popped = tracker.pop().unwrap();
        assert_eq!(popped.id, a);
        assert_eq!(tracker.current_line(), NO_LINE);
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut tracker = StackTracker::new();
        assert!(tracker.pop().is_none());
        assert_eq!(tracker.depth(), 0);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_history_marks_inactive() {
        let mut tracker = StackTracker::new();
        tracker.push("f", "f()", 3);
        tracker.pop();

        assert_eq!(tracker.history().len(), 1);
        let entry = &tracker.history()[0];
        assert!(!entry.active);
        assert_eq!(entry.name, "f");
        assert_eq!(entry.line, 3);
    }

    #[test]
    fn test_ids_monotonic() {
        let mut tracker = StackTracker::new();
        let a = tracker.push("a", "", 1);
        let b = tracker.push("b", "", 1);
        tracker.pop();
        let c = tracker.push("c", "", 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_reset() {
        let mut tracker = StackTracker::new();
        tracker.push("a", "", 1);
        tracker.pop();
        tracker.reset();
        assert_eq!(tracker.depth(), 0);
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.current_line(), NO_LINE);
    }

    proptest! {
        /// For any interleaving of pushes and pops, the stack stays a valid
        /// LIFO: every pop returns the most recently pushed still-active
        /// frame, and history grows by exactly the popped frames.
        #[test]
        fn prop_stack_is_always_lifo(ops in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut tracker = StackTracker::new();
            let mut model: Vec<FrameId> = Vec::new();
            let mut popped_count = 0usize;

            for (i, is_push) in ops.into_iter().enumerate() {
                if is_push {
                    let id = tracker.push(format!("f{}", i), "", (i + 1) as u32);
                    model.push(id);
                } else {
                    let expected = model.pop();
                    let actual = tracker.pop().map(|f| f.id);
                    prop_assert_eq!(actual, expected);
                    if actual.is_some() {
                        popped_count += 1;
                    }
                }

                prop_assert_eq!(tracker.depth(), model.len());
                prop_assert_eq!(tracker.history().len(), popped_count);
            }
        }
    }
}
