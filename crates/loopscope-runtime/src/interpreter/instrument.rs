//! Instrumented scheduling primitives
//!
//! Everything the restricted namespace exposes beyond plain evaluation:
//! console calls, `setTimeout`/`clearTimeout`, promise construction,
//! settlement, and reaction scheduling. Each operation records its frames
//! and task-card entries, so the trace shows scheduling as it happens.
//!
//! Deferred continuations become [`PendingWork`](super::PendingWork)
//! units: reaction bodies
//! are enqueued when their promise settles, timer bodies when the timer
//! fires. The engine drains the queue one unit per step, FIFO, which is
//! what makes already-settled reactions run before later-firing timers.

use super::{Interpreter, ScheduledTimer};
use crate::console::ConsoleLevel;
use crate::promise::{PromiseCell, PromiseHandle, Reaction, ReactionKind, Settlement};
use crate::snapshot::ActiveSubsystem;
use crate::span::Span;
use crate::tasks::TaskKind;
use crate::timers::TimerId;
use crate::value::{Closure, RuntimeError, Settler, Value};
use std::rc::Rc;

impl Interpreter {
    // === Console ===

    /// Run a console call: short-lived frame around the write
    pub(crate) fn console_call(&mut self, level: ConsoleLevel, args: Vec<Value>, span: Span) {
        let name = format!("console.{}", level.method());
        self.stack
            .push(name, self.snippet_of(span), self.line_of(span));
        self.console.write_values(level, &args);
        self.stack.pop();
    }

    // === Timers ===

    /// `setTimeout(callback, delay)`: macrotask card now, real wait in the
    /// timer host, callback body deferred until the timer fires
    pub(crate) fn set_timeout(
        &mut self,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let mut args = args.into_iter();
        let callback = match args.next() {
            Some(Value::Closure(c)) => c,
            other => {
                return Err(RuntimeError::TypeError {
                    msg: format!(
                        "setTimeout callback must be a function, got {}",
                        other.map(|v| v.type_name()).unwrap_or("nothing")
                    ),
                    span,
                })
            }
        };
        let delay_ms = match args.next() {
            None | Some(Value::Undefined) => 0,
            Some(Value::Number(n)) if n.is_finite() && n >= 0.0 => n as u64,
            Some(Value::Number(_)) => 0,
            Some(other) => {
                return Err(RuntimeError::TypeError {
                    msg: format!("setTimeout delay must be a number, got {}", other.type_name()),
                    span,
                })
            }
        };

        let snippet = self.snippet_of(span);
        let line = self.line_of(span);
        let timer_id = self.timers.schedule(delay_ms);
        let task_id = self.tasks.enqueue(
            TaskKind::Macro,
            format!("setTimeout ({}ms)", delay_ms),
            snippet.clone(),
        );
        self.timer_table.insert(
            timer_id,
            ScheduledTimer {
                callback,
                task_id,
                snippet,
                line,
            },
        );
        Ok(Value::Timer(timer_id))
    }

    /// `clearTimeout(handle)`: cancel the wait and drop the macrotask
    /// card. Unknown or already-fired handles are a no-op.
    pub(crate) fn clear_timeout(&mut self, handle: Value) -> Value {
        if let Value::Timer(id) = handle {
            self.timers.cancel(id);
            if let Some(timer) = self.timer_table.remove(&id) {
                self.tasks.remove(timer.task_id);
            }
        }
        Value::Undefined
    }

    /// Turn a fired timer into a pending unit of work. A timer whose
    /// registration was already cleared is skipped.
    pub(crate) fn enqueue_timer_fire(&mut self, timer_id: TimerId) {
        let Some(timer) = self.timer_table.remove(&timer_id) else {
            return;
        };
        self.pending.push_back(Box::new(move |interp: &mut Interpreter| {
            interp.active = ActiveSubsystem::Macro;
            interp.tasks.remove(timer.task_id);
            interp
                .stack
                .push("setTimeout callback", timer.snippet.clone(), timer.line);
            let result = interp.call_closure(&timer.callback, Vec::new());
            interp.stack.pop();
            if let Err(e) = result {
                interp.report_uncaught(e);
            }
        }));
    }

    // === Promises ===

    /// `new Promise(executor)`: run the executor synchronously under a
    /// constructor frame, handing it instrumented resolve/reject
    pub(crate) fn construct_promise(
        &mut self,
        executor: Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let Value::Closure(executor) = executor else {
            return Err(RuntimeError::TypeError {
                msg: format!("Promise resolver {} is not a function", executor.type_name()),
                span,
            });
        };

        let id = self.next_promise_id();
        let promise = PromiseCell::pending(id);
        let resolve = Value::Settler(Rc::new(Settler {
            promise: promise.clone(),
            reject: false,
        }));
        let reject = Value::Settler(Rc::new(Settler {
            promise: promise.clone(),
            reject: true,
        }));

        self.stack
            .push("Promise constructor", self.snippet_of(span), self.line_of(span));
        let result = self.call_closure(&executor, vec![resolve, reject]);
        self.stack.pop();

        // A throwing executor rejects the promise it was constructing.
        if let Err(e) = result {
            if promise.is_pending() {
                self.settle_promise(&promise, Settlement::Rejected(e.into_value()), true);
            }
        }
        Ok(Value::Promise(promise))
    }

    /// Run a resolve/reject capability under its short-lived frame
    pub(crate) fn invoke_settler(&mut self, settler: &Rc<Settler>, arg: Value, span: Span) -> Value {
        let name = if settler.reject {
            "Promise reject"
        } else {
            "Promise resolve"
        };
        self.stack
            .push(name, self.snippet_of(span), self.line_of(span));
        if settler.reject {
            self.settle_promise(&settler.promise, Settlement::Rejected(arg), true);
        } else {
            self.resolve_value(&settler.promise, arg);
        }
        self.stack.pop();
        Value::Undefined
    }

    /// `Promise.resolve` / `Promise.reject`: an instrumented promise that
    /// is settled before anyone can look at it
    pub(crate) fn settled_promise(&mut self, settlement: Settlement) -> Value {
        let promise = PromiseCell::pending(self.next_promise_id());
        match settlement {
            Settlement::Fulfilled(value) => self.resolve_value(&promise, value),
            rejected => self.settle_promise(&promise, rejected, true),
        }
        Value::Promise(promise)
    }

    /// `.then` / `.catch` / `.finally`: microtask card now, handler body
    /// deferred until settlement. Returns the derived promise.
    pub(crate) fn register_reaction(
        &mut self,
        promise: &PromiseHandle,
        kind: ReactionKind,
        on_fulfilled: Option<Rc<Closure>>,
        on_rejected: Option<Rc<Closure>>,
        span: Span,
    ) -> Value {
        let derived = PromiseCell::pending(self.next_promise_id());
        let snippet = self.snippet_of(span);
        let line = self.line_of(span);
        let task_id = self
            .tasks
            .enqueue(TaskKind::Micro, kind.task_label(), snippet.clone());

        let reaction = Reaction {
            kind,
            on_fulfilled,
            on_rejected,
            task_id: Some(task_id),
            derived: derived.clone(),
            snippet,
            line,
        };
        if let Some((settlement, reaction)) = promise.add_reaction(reaction) {
            self.schedule_reaction(settlement, reaction);
        }
        Value::Promise(derived)
    }

    /// Settle a promise and schedule everything waiting on it.
    ///
    /// `watch_unhandled` defers an uncaught-rejection check when a
    /// rejection finds no reactions; the handler-error path passes false
    /// because the failure was already reported at the work boundary.
    pub(crate) fn settle_promise(
        &mut self,
        promise: &PromiseHandle,
        settlement: Settlement,
        watch_unhandled: bool,
    ) {
        let reactions = promise.settle(settlement.clone());

        if reactions.is_empty() && settlement.is_rejection() && watch_unhandled {
            // Reactions may still be registered later in this sync pass,
            // so the check runs as its own unit of deferred work.
            let cell = promise.clone();
            let reason = settlement.value().clone();
            self.pending.push_back(Box::new(move |interp: &mut Interpreter| {
                if !cell.is_handled() {
                    interp.active = ActiveSubsystem::Micro;
                    interp.console.write(
                        ConsoleLevel::Error,
                        format!("Uncaught (in promise) {}", reason),
                    );
                }
            }));
        }

        for reaction in reactions {
            self.schedule_reaction(settlement.clone(), reaction);
        }
    }

    /// Fulfill with a plain value, or adopt the state of a promise value
    pub(crate) fn resolve_value(&mut self, target: &PromiseHandle, value: Value) {
        match value {
            Value::Promise(inner) => {
                let link = Reaction {
                    kind: ReactionKind::Chain,
                    on_fulfilled: None,
                    on_rejected: None,
                    task_id: None,
                    derived: target.clone(),
                    snippet: String::new(),
                    line: 0,
                };
                if let Some((settlement, link)) = inner.add_reaction(link) {
                    self.schedule_reaction(settlement, link);
                }
            }
            value => self.settle_promise(target, Settlement::Fulfilled(value), true),
        }
    }

    fn schedule_reaction(&mut self, settlement: Settlement, reaction: Reaction) {
        self.pending.push_back(Box::new(move |interp: &mut Interpreter| {
            interp.run_reaction(settlement, reaction);
        }));
    }

    /// Run one settled reaction: remove its card, run the matching
    /// handler under a frame, and settle the derived promise from the
    /// handler's outcome.
    fn run_reaction(&mut self, settlement: Settlement, reaction: Reaction) {
        if reaction.kind == ReactionKind::Chain {
            self.forward(&reaction.derived, settlement);
            return;
        }

        self.active = ActiveSubsystem::Micro;
        if let Some(task_id) = reaction.task_id {
            self.tasks.remove(task_id);
        }

        let handler = if settlement.is_rejection() {
            reaction.on_rejected.clone()
        } else {
            reaction.on_fulfilled.clone()
        };
        let Some(handler) = handler else {
            // No handler for this outcome: forward it unchanged.
            self.forward(&reaction.derived, settlement);
            return;
        };

        self.stack
            .push(reaction.kind.frame_name(), reaction.snippet.clone(), reaction.line);
        let result = if reaction.kind == ReactionKind::Finally {
            self.call_closure(&handler, Vec::new())
        } else {
            self.call_closure(&handler, vec![settlement.value().clone()])
        };
        self.stack.pop();

        match result {
            // finally observes the outcome without replacing it
            Ok(_) if reaction.kind == ReactionKind::Finally => {
                self.forward(&reaction.derived, settlement);
            }
            Ok(value) => self.resolve_value(&reaction.derived, value),
            Err(e) => {
                self.report_uncaught(e.clone());
                self.settle_promise(&reaction.derived, Settlement::Rejected(e.into_value()), false);
            }
        }
    }

    fn forward(&mut self, derived: &PromiseHandle, settlement: Settlement) {
        match settlement {
            Settlement::Fulfilled(value) => self.resolve_value(derived, value),
            rejected => self.settle_promise(derived, rejected, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::new(source);
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        interp.run_program(&program).expect("runtime error");
        interp
    }

    /// Drain deferred work the way the engine would, ignoring timers
    fn drain(interp: &mut Interpreter) {
        while let Some(work) = interp.pending.pop_front() {
            work(interp);
        }
    }

    fn frame_names(interp: &Interpreter) -> Vec<&str> {
        interp
            .stack
            .history()
            .iter()
            .map(|f| f.name.as_str())
            .collect()
    }

    #[test]
    fn test_console_call_frames() {
        let interp = run("console.log('hello');");
        assert_eq!(frame_names(&interp), vec!["console.log"]);
        assert_eq!(interp.console.lines(), &["hello".to_string()]);
        assert_eq!(interp.stack.depth(), 0);
    }

    #[test]
    fn test_set_timeout_creates_macrotask_card() {
        let interp = run("setTimeout(() => { console.log('later'); }, 500);");
        let cards = interp.tasks.macro_tasks();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].label, "setTimeout (500ms)");
        assert_eq!(interp.timer_table.len(), 1);
    }

    #[test]
    fn test_non_ascii_source_keeps_cards_aligned() {
        // Multi-byte characters before the call must not shift card
        // snippets or line attribution.
        let interp = run(
            "console.log('héé');\n\
             setTimeout(() => { console.log('later'); }, 10);",
        );
        let cards = interp.tasks.macro_tasks();
        assert_eq!(cards.len(), 1);
        assert!(
            cards[0].source_text.starts_with("setTimeout"),
            "misaligned snippet: {:?}",
            cards[0].source_text
        );
        let timer = interp.timer_table.values().next().expect("timer entry");
        assert_eq!(timer.line, 2);
    }

    #[test]
    fn test_clear_timeout_removes_card() {
        let mut interp = run("let t = setTimeout(() => {}, 500);\nclearTimeout(t);");
        assert!(interp.tasks.is_empty());
        assert!(interp.timer_table.is_empty());
        // Clearing twice is a no-op.
        let handle = interp.globals.get("t").unwrap();
        interp.clear_timeout(handle);
        assert!(interp.tasks.is_empty());
    }

    #[test]
    fn test_executor_runs_synchronously() {
        let interp = run(
            "new Promise((resolve) => {\n\
               console.log('inside');\n\
               resolve('done');\n\
             });",
        );
        assert_eq!(
            frame_names(&interp),
            vec!["console.log", "Promise resolve", "Promise constructor"]
        );
        assert_eq!(interp.console.lines(), &["inside".to_string()]);
    }

    #[test]
    fn test_reaction_card_appears_at_registration() {
        let interp = run(
            "let p = new Promise((resolve) => {});\n\
             p.then((v) => { console.log(v); });",
        );
        let cards = interp.tasks.micro();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].label, "Promise.then");
    }

    #[test]
    fn test_settled_reaction_runs_on_drain() {
        let mut interp = run(
            "Promise.resolve('value').then((v) => { console.log('got', v); });",
        );
        assert_eq!(interp.pending.len(), 1);
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["got value".to_string()]);
        assert!(interp.tasks.is_empty());
        assert_eq!(interp.stack.depth(), 0);
        assert!(frame_names(&interp).contains(&"Promise.then handler"));
    }

    #[test]
    fn test_then_chain_threads_values() {
        let mut interp = run(
            "Promise.resolve(1)\n\
               .then((n) => n + 1)\n\
               .then((n) => { console.log('sum', n); });",
        );
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["sum 2".to_string()]);
    }

    #[test]
    fn test_catch_receives_rejection() {
        let mut interp = run(
            "new Promise((resolve, reject) => { reject('bad'); })\n\
               .catch((e) => { console.log('caught', e); });",
        );
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["caught bad".to_string()]);
    }

    #[test]
    fn test_throwing_handler_reports_and_rejects_derived() {
        let mut interp = run(
            "Promise.resolve('x')\n\
               .then((v) => { throw 'handler boom'; })\n\
               .catch((e) => { console.log('recovered', e); });",
        );
        drain(&mut interp);
        assert_eq!(
            interp.console.lines(),
            &[
                "Error: handler boom".to_string(),
                "recovered handler boom".to_string(),
            ]
        );
        assert_eq!(interp.stack.depth(), 0);
        assert!(interp.tasks.is_empty());
    }

    #[test]
    fn test_unhandled_rejection_logged() {
        let mut interp = run("Promise.reject('nobody listens');");
        drain(&mut interp);
        assert_eq!(
            interp.console.lines(),
            &["Error: Uncaught (in promise) nobody listens".to_string()]
        );
    }

    #[test]
    fn test_rejection_handled_later_in_pass_not_logged() {
        let mut interp = run(
            "let p = Promise.reject('handled');\n\
             p.catch((e) => { console.log('ok', e); });",
        );
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["ok handled".to_string()]);
    }

    #[test]
    fn test_finally_preserves_outcome() {
        let mut interp = run(
            "Promise.resolve('kept')\n\
               .finally(() => { console.log('cleanup'); })\n\
               .then((v) => { console.log('value', v); });",
        );
        drain(&mut interp);
        assert_eq!(
            interp.console.lines(),
            &["cleanup".to_string(), "value kept".to_string()]
        );
    }

    #[test]
    fn test_handler_returning_promise_is_adopted() {
        let mut interp = run(
            "Promise.resolve('a')\n\
               .then((v) => Promise.resolve(v + 'b'))\n\
               .then((v) => { console.log(v); });",
        );
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["ab".to_string()]);
    }

    #[test]
    fn test_passthrough_without_handler() {
        let mut interp = run(
            "Promise.reject('skip')\n\
               .then((v) => { console.log('never'); })\n\
               .catch((e) => { console.log('end', e); });",
        );
        drain(&mut interp);
        assert_eq!(interp.console.lines(), &["end skip".to_string()]);
    }
}
