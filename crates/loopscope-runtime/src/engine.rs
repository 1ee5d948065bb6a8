//! Execution engine
//!
//! The `Simulator` facade: initialize with source, run the synchronous
//! pass with `start()`, then drive deferred work one unit at a time with
//! `step()`. Every failure mode is contained here; callers never see a
//! panic or a propagated error, only snapshots whose output log carries
//! the error lines.
//!
//! One unit of deferred work per step, FIFO by enqueue time. Reaction
//! bodies enter the queue when their promise settles and timer bodies
//! when their timer fires, so reactions on already-settled promises
//! always run before a timer that fires later. There is no separate
//! "drain all microtasks first" rule.

use crate::console::ConsoleLevel;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::snapshot::{ActiveSubsystem, Snapshot};
use crate::span::{LineIndex, Span};

/// Steppable event-loop simulator for one script
pub struct Simulator {
    interp: Interpreter,
    source: String,
    started: bool,
    running: bool,
    finished: bool,
}

impl Simulator {
    /// Create an idle simulator for the given source
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            interp: Interpreter::new(&source),
            source,
            started: false,
            running: false,
            finished: false,
        }
    }

    /// Reset every owned component and load new source. Outstanding
    /// timers from the previous run are cancelled first.
    pub fn initialize(&mut self, source: impl Into<String>) {
        self.interp.timers.cancel_all();
        self.source = source.into();
        self.interp = Interpreter::new(&self.source);
        self.started = false;
        self.running = false;
        self.finished = false;
    }

    /// Run the synchronous pass: root frame, lex, parse, evaluate the
    /// top-level statements, pop the root frame.
    ///
    /// Lex, parse, or top-level runtime failures append error lines and
    /// finish the run immediately. Calling `start` twice is a no-op.
    pub fn start(&mut self) -> Snapshot {
        if self.started {
            return self.current_state();
        }
        self.started = true;
        self.running = true;

        let (tokens, mut diags) = Lexer::new(self.source.as_str()).tokenize();
        let (program, parse_diags) = Parser::new(tokens).parse();
        diags.extend(parse_diags);
        if !diags.is_empty() {
            let lines = LineIndex::new(&self.source);
            for diag in &diags {
                self.interp.console.write(
                    ConsoleLevel::Error,
                    format!("{} (line {})", diag.message, lines.line_at(diag.span.start)),
                );
            }
            self.fail_run();
            return self.current_state();
        }

        let root_snippet = self.interp.snippet_of(Span::new(0, self.source.len()));
        self.interp.stack.push("global execution context", root_snippet, 1);
        let result = self.interp.run_program(&program);
        self.interp.stack.pop();

        if let Err(e) = result {
            self.interp.report_uncaught(e);
            self.fail_run();
            return self.current_state();
        }

        self.interp.active = ActiveSubsystem::Stack;
        self.current_state()
    }

    /// Advance by one unit of deferred work.
    ///
    /// Fired timers are folded into the pending queue first (in firing
    /// order), then exactly one unit runs. When the pending queue, both
    /// task lists, and the live stack are all empty the run is finished;
    /// stepping a finished run is a snapshot-only no-op.
    pub fn step(&mut self) -> Snapshot {
        if self.finished || !self.started {
            return self.current_state();
        }
        self.running = true;

        for timer_id in self.interp.timers.drain_fired() {
            self.interp.enqueue_timer_fire(timer_id);
        }
        if let Some(work) = self.interp.pending.pop_front() {
            work(&mut self.interp);
        }

        if self.interp.pending.is_empty()
            && self.interp.tasks.is_empty()
            && self.interp.stack.depth() == 0
        {
            self.finished = true;
            self.running = false;
            self.interp.active = ActiveSubsystem::None;
            self.interp.timers.cancel_all();
        }
        self.current_state()
    }

    /// Stop advancing without discarding queued work; the next `step()`
    /// resumes.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Cancel every outstanding real-time wait. Idempotent.
    pub fn cleanup(&mut self) {
        self.interp.timers.cancel_all();
    }

    /// Snapshot without mutating anything
    pub fn current_state(&self) -> Snapshot {
        Snapshot {
            call_stack: self.interp.stack.frames().to_vec(),
            call_stack_history: self.interp.stack.history().to_vec(),
            micro_tasks: self.interp.tasks.micro().to_vec(),
            macro_tasks: self.interp.tasks.macro_tasks().to_vec(),
            current_line: self.interp.stack.current_line(),
            running: self.running,
            finished: self.finished,
            active: if self.finished {
                ActiveSubsystem::None
            } else {
                self.interp.active
            },
            console_output: self.interp.console.to_vec(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Timers still waiting to fire (drivers sleep-and-retry on these)
    pub fn pending_timers(&self) -> usize {
        self.interp.timers.pending()
    }

    fn fail_run(&mut self) {
        self.running = false;
        self.finished = true;
        self.interp.active = ActiveSubsystem::None;
        self.interp.timers.cancel_all();
        self.interp.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sync_pass_runs_console_output() {
        let mut sim = Simulator::new("console.log('Start');\nconsole.log('End');");
        let snap = sim.start();

        assert!(snap.running);
        assert!(!snap.finished);
        assert_eq!(snap.console_output, vec!["Start", "End"]);
        assert!(snap.call_stack.is_empty());
        // Root frame plus two console frames completed.
        assert_eq!(snap.call_stack_history.len(), 3);
        assert_eq!(
            snap.call_stack_history.last().map(|f| f.name.as_str()),
            Some("global execution context")
        );
    }

    #[test]
    fn test_empty_source_finishes_after_first_step() {
        let mut sim = Simulator::new("");
        let started = sim.start();
        assert!(started.running);
        assert!(!started.finished);
        assert_eq!(started.call_stack_history.len(), 1);

        let stepped = sim.step();
        assert!(stepped.finished);
        assert!(!stepped.running);
        assert_eq!(stepped.active, ActiveSubsystem::None);
    }

    #[test]
    fn test_step_is_idempotent_when_finished() {
        let mut sim = Simulator::new("console.log('once');");
        sim.start();
        sim.step();
        assert!(sim.is_finished());

        let a = sim.step();
        let b = sim.step();
        assert_eq!(a, b);
        assert_eq!(a.console_output, vec!["once"]);
    }

    #[test]
    fn test_step_before_start_is_noop() {
        let mut sim = Simulator::new("console.log('never');");
        let snap = sim.step();
        assert!(!snap.running);
        assert!(snap.console_output.is_empty());
    }

    #[test]
    fn test_parse_failure_finishes_with_error_line() {
        let mut sim = Simulator::new("let = 5;");
        let snap = sim.start();

        assert!(snap.finished);
        assert!(!snap.running);
        assert!(!snap.console_output.is_empty());
        assert!(snap.console_output[0].starts_with("Error: "));

        // Finished stays terminal.
        let again = sim.step();
        assert_eq!(again, snap);
    }

    #[test]
    fn test_top_level_throw_finishes_run() {
        let mut sim = Simulator::new("console.log('before');\nthrow 'fatal';");
        let snap = sim.start();

        assert!(snap.finished);
        assert_eq!(snap.console_output, vec!["before", "Error: fatal"]);
        assert_eq!(snap.call_stack.len(), 0);
    }

    #[test]
    fn test_pause_keeps_queued_work() {
        let mut sim = Simulator::new("Promise.resolve(1).then((v) => { console.log('later', v); });");
        sim.start();
        sim.pause();

        let paused = sim.current_state();
        assert!(!paused.running);
        assert_eq!(paused.micro_tasks.len(), 1);

        let resumed = sim.step();
        assert_eq!(resumed.console_output, vec!["later 1"]);
        assert!(resumed.micro_tasks.is_empty());
    }

    #[test]
    fn test_initialize_resets_state() {
        let mut sim = Simulator::new("console.log('first');");
        sim.start();
        sim.step();
        assert!(sim.is_finished());

        sim.initialize("console.log('second');");
        assert!(!sim.is_finished());
        let snap = sim.start();
        assert_eq!(snap.console_output, vec!["second"]);
    }

    #[test]
    fn test_current_state_does_not_mutate() {
        let mut sim = Simulator::new("console.log('x');");
        sim.start();
        let a = sim.current_state();
        let b = sim.current_state();
        assert_eq!(a, b);
    }
}
