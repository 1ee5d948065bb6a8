//! Instrumented promise cells
//!
//! State machine for the promises scripts create with `new Promise`,
//! `.then`, `.catch`, and `.finally`. A cell starts pending, settles
//! exactly once, and hands its queued reactions back to the caller at
//! settlement time so they can be turned into microtask work. The cell
//! itself never schedules anything; scheduling lives in the interpreter's
//! instrumentation layer.

use crate::tasks::TaskId;
use crate::value::{Closure, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared handle to a promise cell
pub type PromiseHandle = Rc<PromiseCell>;

/// How a promise settled
#[derive(Debug, Clone)]
pub enum Settlement {
    Fulfilled(Value),
    Rejected(Value),
}

impl Settlement {
    /// The fulfillment value or rejection reason
    pub fn value(&self) -> &Value {
        match self {
            Settlement::Fulfilled(v) | Settlement::Rejected(v) => v,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Settlement::Rejected(_))
    }
}

/// Which combinator registered a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Then,
    Catch,
    Finally,
    /// Internal adoption link: a derived promise waiting on the promise a
    /// handler returned. Never surfaces as a task or frame.
    Chain,
}

impl ReactionKind {
    /// Label shown on the task card
    pub fn task_label(&self) -> &'static str {
        match self {
            ReactionKind::Then => "Promise.then",
            ReactionKind::Catch => "Promise.catch",
            ReactionKind::Finally => "Promise.finally",
            ReactionKind::Chain => "Promise chain",
        }
    }

    /// Frame name used while the handler body runs
    pub fn frame_name(&self) -> &'static str {
        match self {
            ReactionKind::Then => "Promise.then handler",
            ReactionKind::Catch => "Promise.catch handler",
            ReactionKind::Finally => "Promise.finally handler",
            ReactionKind::Chain => "Promise chain",
        }
    }
}

/// A handler registration waiting for its promise to settle
pub struct Reaction {
    pub kind: ReactionKind,
    /// Handler for the fulfilled path (`then(f)` / `finally(f)`)
    pub on_fulfilled: Option<Rc<Closure>>,
    /// Handler for the rejected path (`catch(f)` / `then(_, f)` / `finally(f)`)
    pub on_rejected: Option<Rc<Closure>>,
    /// Queue entry created at registration time; removed when the
    /// reaction runs. Chain reactions have none.
    pub task_id: Option<TaskId>,
    /// Promise produced by the registering combinator
    pub derived: PromiseHandle,
    /// Source snippet of the registering call
    pub snippet: String,
    /// 1-based line of the registering call
    pub line: u32,
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("kind", &self.kind)
            .field("task_id", &self.task_id)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum PromiseState {
    Pending { reactions: Vec<Reaction> },
    Settled(Settlement),
}

/// One promise: identity, settlement state, and queued reactions
#[derive(Debug)]
pub struct PromiseCell {
    /// Stable id for display and debugging
    pub id: u64,
    state: RefCell<PromiseState>,
    /// Set once any reaction (or adoption link) is registered; a rejection
    /// with this still clear is reported as uncaught.
    handled: Cell<bool>,
}

impl PromiseCell {
    /// Create a pending promise
    pub fn pending(id: u64) -> PromiseHandle {
        Rc::new(PromiseCell {
            id,
            state: RefCell::new(PromiseState::Pending {
                reactions: Vec::new(),
            }),
            handled: Cell::new(false),
        })
    }

    /// Create an already-settled promise (`Promise.resolve` / `Promise.reject`)
    pub fn settled(id: u64, settlement: Settlement) -> PromiseHandle {
        Rc::new(PromiseCell {
            id,
            state: RefCell::new(PromiseState::Settled(settlement)),
            handled: Cell::new(false),
        })
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending { .. })
    }

    /// Display name for the promise's state
    pub fn state_label(&self) -> &'static str {
        match &*self.state.borrow() {
            PromiseState::Pending { .. } => "pending",
            PromiseState::Settled(Settlement::Fulfilled(_)) => "fulfilled",
            PromiseState::Settled(Settlement::Rejected(_)) => "rejected",
        }
    }

    /// Current settlement, if any
    pub fn settlement(&self) -> Option<Settlement> {
        match &*self.state.borrow() {
            PromiseState::Pending { .. } => None,
            PromiseState::Settled(s) => Some(s.clone()),
        }
    }

    /// Settle the promise and hand back every queued reaction, in
    /// registration order. Settling an already-settled promise is a no-op
    /// that returns nothing (first settlement wins).
    pub fn settle(&self, settlement: Settlement) -> Vec<Reaction> {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            PromiseState::Pending { reactions } => {
                let drained = std::mem::take(reactions);
                *state = PromiseState::Settled(settlement);
                drained
            }
            PromiseState::Settled(_) => Vec::new(),
        }
    }

    /// Register a reaction. Returns the settlement when the promise has
    /// already settled, in which case the caller must schedule the
    /// reaction itself; otherwise the reaction is queued on the cell.
    pub fn add_reaction(&self, reaction: Reaction) -> Option<(Settlement, Reaction)> {
        self.handled.set(true);
        let mut state = self.state.borrow_mut();
        match &mut *state {
            PromiseState::Pending { reactions } => {
                reactions.push(reaction);
                None
            }
            PromiseState::Settled(s) => Some((s.clone(), reaction)),
        }
    }

    /// True once at least one reaction has been registered
    pub fn is_handled(&self) -> bool {
        self.handled.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(kind: ReactionKind, derived: PromiseHandle) -> Reaction {
        Reaction {
            kind,
            on_fulfilled: None,
            on_rejected: None,
            task_id: None,
            derived,
            snippet: String::new(),
            line: 1,
        }
    }

    #[test]
    fn test_settle_drains_reactions_in_order() {
        let cell = PromiseCell::pending(1);
        cell.add_reaction(reaction(ReactionKind::Then, PromiseCell::pending(2)));
        cell.add_reaction(reaction(ReactionKind::Catch, PromiseCell::pending(3)));

        let drained = cell.settle(Settlement::Fulfilled(Value::Number(1.0)));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, ReactionKind::Then);
        assert_eq!(drained[1].kind, ReactionKind::Catch);
        assert_eq!(cell.state_label(), "fulfilled");
    }

    #[test]
    fn test_first_settlement_wins() {
        let cell = PromiseCell::pending(1);
        cell.settle(Settlement::Fulfilled(Value::string("first")));
        let drained = cell.settle(Settlement::Rejected(Value::string("late")));

        assert!(drained.is_empty());
        match cell.settlement() {
            Some(Settlement::Fulfilled(v)) => assert_eq!(v, Value::string("first")),
            other => panic!("unexpected settlement: {:?}", other),
        }
    }

    #[test]
    fn test_reaction_on_settled_promise_returned_to_caller() {
        let cell = PromiseCell::settled(1, Settlement::Rejected(Value::string("boom")));
        let out = cell.add_reaction(reaction(ReactionKind::Catch, PromiseCell::pending(2)));

        let (settlement, returned) = out.expect("settled promise hands the reaction back");
        assert!(settlement.is_rejection());
        assert_eq!(returned.kind, ReactionKind::Catch);
    }

    #[test]
    fn test_handled_flag() {
        let cell = PromiseCell::pending(1);
        assert!(!cell.is_handled());
        cell.add_reaction(reaction(ReactionKind::Then, PromiseCell::pending(2)));
        assert!(cell.is_handled());
    }

    #[test]
    fn test_pending_label() {
        let cell = PromiseCell::pending(1);
        assert!(cell.is_pending());
        assert_eq!(cell.state_label(), "pending");
        cell.settle(Settlement::Rejected(Value::Null));
        assert_eq!(cell.state_label(), "rejected");
    }
}
