//! Tree-walking interpreter with execution instrumentation
//!
//! Evaluates the parsed program against a restricted global namespace
//! (`console`, `setTimeout`/`clearTimeout`, `Promise`, `undefined`) and
//! records every instrumented operation in the stack tracker, task
//! registry, and console sink it owns. Nothing is installed process-wide;
//! two interpreters never share state.
//!
//! Split by concern:
//! - `expr` / `stmt`: plain evaluation
//! - `instrument`: the scheduling primitives and promise machinery

mod expr;
mod instrument;
mod stmt;

use crate::ast::{FunctionBody, Program};
use crate::console::ConsoleSink;
use crate::snapshot::ActiveSubsystem;
use crate::span::{LineIndex, Span};
use crate::stack::StackTracker;
use crate::tasks::TaskRegistry;
use crate::timers::{TimerHost, TimerId};
use crate::value::{Builtin, Closure, EnvRef, Environment, RuntimeError, Value};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// One deferred unit of work, consumed FIFO by the engine
pub(crate) type PendingWork = Box<dyn FnOnce(&mut Interpreter)>;

/// Frame/task snippets are cut to this many characters
const SNIPPET_MAX: usize = 40;

/// A registered timeout waiting to fire
pub(crate) struct ScheduledTimer {
    pub callback: Rc<Closure>,
    pub task_id: crate::tasks::TaskId,
    pub snippet: String,
    pub line: u32,
}

/// Non-error control flow inside a function body
pub(crate) enum ControlFlow {
    None,
    Return(Value),
}

/// The interpreter: evaluation state plus every instrumented component
pub struct Interpreter {
    source: Rc<str>,
    lines: LineIndex,
    pub(crate) globals: EnvRef,
    pub(crate) stack: StackTracker,
    pub(crate) tasks: TaskRegistry,
    pub(crate) console: ConsoleSink,
    pub(crate) active: ActiveSubsystem,
    pub(crate) pending: VecDeque<PendingWork>,
    pub(crate) timers: TimerHost,
    pub(crate) timer_table: HashMap<TimerId, ScheduledTimer>,
    next_promise_id: u64,
    control: ControlFlow,
}

impl Interpreter {
    /// Create an interpreter for the given source with a fresh restricted
    /// namespace
    pub fn new(source: &str) -> Self {
        let globals = Environment::root();
        globals.define("console", Value::Console);
        globals.define("Promise", Value::PromiseCtor);
        globals.define("setTimeout", Value::Builtin(Builtin::SetTimeout));
        globals.define("clearTimeout", Value::Builtin(Builtin::ClearTimeout));
        globals.define("undefined", Value::Undefined);

        Self {
            source: Rc::from(source),
            lines: LineIndex::new(source),
            globals,
            stack: StackTracker::new(),
            tasks: TaskRegistry::new(),
            console: ConsoleSink::new(),
            active: ActiveSubsystem::None,
            pending: VecDeque::new(),
            timers: TimerHost::new(),
            timer_table: HashMap::new(),
            next_promise_id: 1,
            control: ControlFlow::None,
        }
    }

    /// Run the top-level statements synchronously
    pub fn run_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.active = ActiveSubsystem::Stack;
        let globals = self.globals.clone();
        for stmt in &program.body {
            self.exec_stmt(stmt, &globals)?;
        }
        Ok(())
    }

    /// Call a user function with no frame instrumentation. Frames belong
    /// to instrumented units of work; plain calls stay invisible.
    pub(crate) fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let env = Environment::child(closure.env.clone());
        for (i, param) in closure.params.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or(Value::Undefined);
            env.define(param.name.clone(), arg);
        }

        let saved = std::mem::replace(&mut self.control, ControlFlow::None);
        let result = match &closure.body {
            FunctionBody::Expr(expr) => self.eval_expr(expr, &env),
            FunctionBody::Block(block) => {
                let mut out = Ok(Value::Undefined);
                for stmt in &block.statements {
                    if let Err(e) = self.exec_stmt(stmt, &env) {
                        out = Err(e);
                        break;
                    }
                    if let ControlFlow::Return(value) =
                        std::mem::replace(&mut self.control, ControlFlow::None)
                    {
                        out = Ok(value);
                        break;
                    }
                }
                out
            }
        };
        self.control = saved;
        result
    }

    /// Next promise id (display identity, separate from frame/task ids)
    pub(crate) fn next_promise_id(&mut self) -> u64 {
        let id = self.next_promise_id;
        self.next_promise_id += 1;
        id
    }

    /// 1-based line of a span's start
    pub(crate) fn line_of(&self, span: Span) -> u32 {
        self.lines.line_at(span.start)
    }

    /// Source snippet for a span: first line only, truncated
    pub(crate) fn snippet_of(&self, span: Span) -> String {
        let text = self
            .source
            .get(span.start..span.end)
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .trim();
        if text.chars().count() > SNIPPET_MAX {
            let cut: String = text.chars().take(SNIPPET_MAX).collect();
            format!("{}...", cut)
        } else {
            text.to_string()
        }
    }

    /// Append an error line for a failure nothing in the script handled
    pub(crate) fn report_uncaught(&mut self, error: RuntimeError) {
        self.console
            .write(crate::console::ConsoleLevel::Error, error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::new(source);
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        interp.run_program(&program).expect("runtime error");
        interp
    }

    #[test]
    fn test_snippet_truncation() {
        let long = "console.log('a very very very very very long message here');";
        let interp = Interpreter::new(long);
        let snippet = interp.snippet_of(Span::new(0, long.len()));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_MAX + 3);
    }

    #[test]
    fn test_plain_calls_push_no_frames() {
        let interp = run("function f() { return 1; }\nlet x = f();");
        assert_eq!(interp.stack.depth(), 0);
        assert!(interp.stack.history().is_empty());
    }

    #[test]
    fn test_closure_captures_outer_binding() {
        let interp = run(
            "let greeting = 'hi';\n\
             function speak() { console.log(greeting); }\n\
             speak();",
        );
        assert_eq!(interp.console.lines(), &["hi".to_string()]);
    }

    #[test]
    fn test_return_stops_body() {
        let interp = run(
            "function f() { return 'early'; console.log('late'); }\n\
             console.log(f());",
        );
        assert_eq!(interp.console.lines(), &["early".to_string()]);
    }
}
