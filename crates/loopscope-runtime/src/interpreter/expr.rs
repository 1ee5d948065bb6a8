//! Expression evaluation
//!
//! Plain evaluation plus call dispatch. Calls that hit the restricted
//! namespace (`console.*`, `setTimeout`, promise combinators) hand off to
//! the instrumentation layer; everything else is ordinary tree-walking.

use super::Interpreter;
use crate::ast::{
    BinaryExpr, BinaryOp, CallExpr, Expr, FunctionExpr, Literal, MemberExpr, NewExpr, UnaryExpr,
    UnaryOp,
};
use crate::console::ConsoleLevel;
use crate::promise::{ReactionKind, Settlement};
use crate::value::{Builtin, Closure, EnvRef, RuntimeError, Value};
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit, _) => Ok(eval_literal(lit)),
            Expr::Identifier(id) => {
                env.get(&id.name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: id.name.clone(),
                        span: id.span,
                    })
            }
            Expr::Assign(assign) => {
                let value = self.eval_expr(&assign.value, env)?;
                if env.assign(&assign.target.name, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::UndefinedVariable {
                        name: assign.target.name.clone(),
                        span: assign.target.span,
                    })
                }
            }
            Expr::Binary(binary) => self.eval_binary(binary, env),
            Expr::Unary(unary) => self.eval_unary(unary, env),
            Expr::Function(function) => Ok(self.make_closure(function, env, None)),
            Expr::Call(call) => self.eval_call(call, env),
            Expr::Member(member) => Err(RuntimeError::TypeError {
                msg: format!("property '{}' is only supported in calls", member.property.name),
                span: member.span,
            }),
            Expr::New(new) => self.eval_new(new, env),
        }
    }

    /// Build a closure value capturing the current environment
    pub(crate) fn make_closure(
        &self,
        function: &FunctionExpr,
        env: &EnvRef,
        name: Option<String>,
    ) -> Value {
        Value::Closure(Rc::new(Closure {
            params: function.params.clone(),
            body: function.body.clone(),
            env: env.clone(),
            span: function.span,
            name,
        }))
    }

    fn eval_binary(&mut self, binary: &BinaryExpr, env: &EnvRef) -> Result<Value, RuntimeError> {
        // Short-circuit forms evaluate the right side lazily and yield the
        // deciding operand, as in JavaScript.
        match binary.op {
            BinaryOp::And => {
                let left = self.eval_expr(&binary.left, env)?;
                return if left.is_truthy() {
                    self.eval_expr(&binary.right, env)
                } else {
                    Ok(left)
                };
            }
            BinaryOp::Or => {
                let left = self.eval_expr(&binary.left, env)?;
                return if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_expr(&binary.right, env)
                };
            }
            _ => {}
        }

        let left = self.eval_expr(&binary.left, env)?;
        let right = self.eval_expr(&binary.right, env)?;

        let numeric = |op: &'static str| RuntimeError::TypeError {
            msg: format!(
                "cannot apply '{}' to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
            span: binary.span,
        };

        match binary.op {
            BinaryOp::Add => match (&left, &right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::string(format!("{}{}", left, right)))
                }
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                _ => Err(numeric("+")),
            },
            BinaryOp::Sub => num_op(&left, &right, |a, b| a - b).ok_or_else(|| numeric("-")),
            BinaryOp::Mul => num_op(&left, &right, |a, b| a * b).ok_or_else(|| numeric("*")),
            BinaryOp::Div => num_op(&left, &right, |a, b| a / b).ok_or_else(|| numeric("/")),
            BinaryOp::Mod => num_op(&left, &right, |a, b| a % b).ok_or_else(|| numeric("%")),
            // The subset treats `==`/`!=` as their strict forms.
            BinaryOp::Eq | BinaryOp::StrictEq => Ok(Value::Bool(left == right)),
            BinaryOp::Ne | BinaryOp::StrictNe => Ok(Value::Bool(left != right)),
            BinaryOp::Lt => compare(&left, &right, |o| o.is_lt()).ok_or_else(|| numeric("<")),
            BinaryOp::Le => compare(&left, &right, |o| o.is_le()).ok_or_else(|| numeric("<=")),
            BinaryOp::Gt => compare(&left, &right, |o| o.is_gt()).ok_or_else(|| numeric(">")),
            BinaryOp::Ge => compare(&left, &right, |o| o.is_ge()).ok_or_else(|| numeric(">=")),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_unary(&mut self, unary: &UnaryExpr, env: &EnvRef) -> Result<Value, RuntimeError> {
        let operand = self.eval_expr(&unary.operand, env)?;
        match unary.op {
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
            UnaryOp::Neg => match operand {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(RuntimeError::TypeError {
                    msg: format!("cannot negate {}", other.type_name()),
                    span: unary.span,
                }),
            },
        }
    }

    fn eval_call(&mut self, call: &CallExpr, env: &EnvRef) -> Result<Value, RuntimeError> {
        // Method-style calls on namespace objects dispatch directly; the
        // member expression is never evaluated on its own.
        if let Expr::Member(member) = &call.callee {
            return self.eval_method_call(call, member, env);
        }

        let callee = self.eval_expr(&call.callee, env)?;
        let args = self.eval_args(&call.args, env)?;

        match callee {
            Value::Closure(closure) => self.call_closure(&closure, args),
            Value::Builtin(Builtin::SetTimeout) => self.set_timeout(args, call.span),
            Value::Builtin(Builtin::ClearTimeout) => {
                Ok(self.clear_timeout(args.into_iter().next().unwrap_or(Value::Undefined)))
            }
            Value::Settler(settler) => Ok(self.invoke_settler(
                &settler,
                args.into_iter().next().unwrap_or(Value::Undefined),
                call.span,
            )),
            Value::PromiseCtor => Err(RuntimeError::TypeError {
                msg: "Promise constructor cannot be invoked without 'new'".to_string(),
                span: call.span,
            }),
            other => Err(RuntimeError::TypeError {
                msg: format!("{} is not a function", other.type_name()),
                span: call.span,
            }),
        }
    }

    fn eval_method_call(
        &mut self,
        call: &CallExpr,
        member: &MemberExpr,
        env: &EnvRef,
    ) -> Result<Value, RuntimeError> {
        let object = self.eval_expr(&member.object, env)?;
        let method = member.property.name.as_str();

        match object {
            Value::Console => {
                let level = ConsoleLevel::from_method(method).ok_or_else(|| {
                    RuntimeError::TypeError {
                        msg: format!("console.{} is not a function", method),
                        span: member.span,
                    }
                })?;
                let args = self.eval_args(&call.args, env)?;
                self.console_call(level, args, call.span);
                Ok(Value::Undefined)
            }
            Value::PromiseCtor => {
                let arg = match call.args.first() {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                match method {
                    // Promise.resolve on a promise passes it through.
                    "resolve" => match arg {
                        Value::Promise(p) => Ok(Value::Promise(p)),
                        value => Ok(self.settled_promise(Settlement::Fulfilled(value))),
                    },
                    "reject" => Ok(self.settled_promise(Settlement::Rejected(arg))),
                    _ => Err(RuntimeError::TypeError {
                        msg: format!("Promise.{} is not a function", method),
                        span: member.span,
                    }),
                }
            }
            Value::Promise(promise) => {
                let args = self.eval_args(&call.args, env)?;
                let mut handlers = args.into_iter().map(as_handler);
                let first = handlers.next().flatten();
                let second = handlers.next().flatten();

                let kind = match method {
                    "then" => ReactionKind::Then,
                    "catch" => ReactionKind::Catch,
                    "finally" => ReactionKind::Finally,
                    _ => {
                        return Err(RuntimeError::TypeError {
                            msg: format!("promise.{} is not a function", method),
                            span: member.span,
                        })
                    }
                };
                let (on_fulfilled, on_rejected) = match kind {
                    ReactionKind::Then => (first, second),
                    ReactionKind::Catch => (None, first),
                    // A finally handler runs on both paths.
                    ReactionKind::Finally => (first.clone(), first),
                    ReactionKind::Chain => unreachable!(),
                };
                Ok(self.register_reaction(&promise, kind, on_fulfilled, on_rejected, call.span))
            }
            other => Err(RuntimeError::TypeError {
                msg: format!("{}.{} is not a function", other.type_name(), method),
                span: member.span,
            }),
        }
    }

    fn eval_new(&mut self, new: &NewExpr, env: &EnvRef) -> Result<Value, RuntimeError> {
        let callee = self.eval_expr(&new.callee, env)?;
        match callee {
            Value::PromiseCtor => {
                let executor = match new.args.first() {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                self.construct_promise(executor, new.span)
            }
            other => Err(RuntimeError::TypeError {
                msg: format!("{} is not a constructor", other.type_name()),
                span: new.span,
            }),
        }
    }

    fn eval_args(&mut self, args: &[Expr], env: &EnvRef) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a, env)).collect()
    }
}

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

fn num_op(left: &Value, right: &Value, op: impl Fn(f64, f64) -> f64) -> Option<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Some(Value::Number(op(*a, *b))),
        _ => None,
    }
}

fn compare(
    left: &Value,
    right: &Value,
    pick: impl Fn(std::cmp::Ordering) -> bool,
) -> Option<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b)?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => return None,
    };
    Some(Value::Bool(pick(ordering)))
}

/// Treat a handler argument as callable; non-functions act as absent
/// (pass-through), as JavaScript's promise combinators do.
fn as_handler(value: Value) -> Option<Rc<Closure>> {
    match value {
        Value::Closure(c) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval_source(source: &str) -> Result<Interpreter, RuntimeError> {
        let mut interp = Interpreter::new(source);
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        interp.run_program(&program)?;
        Ok(interp)
    }

    fn logged(source: &str) -> Vec<String> {
        eval_source(source).expect("runtime error").console.to_vec()
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(logged("console.log(1 + 2 * 3);"), vec!["7"]);
        assert_eq!(logged("console.log((1 + 2) * 3);"), vec!["9"]);
        assert_eq!(logged("console.log(7 % 3);"), vec!["1"]);
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(logged("console.log('n = ' + 5);"), vec!["n = 5"]);
    }

    #[test]
    fn test_division_never_raises() {
        assert_eq!(logged("console.log(1 / 0);"), vec!["Infinity"]);
        assert_eq!(logged("console.log(0 / 0);"), vec!["NaN"]);
    }

    #[test]
    fn test_equality_is_strict() {
        assert_eq!(logged("console.log(1 == '1');"), vec!["false"]);
        assert_eq!(logged("console.log(1 === 1);"), vec!["true"]);
        assert_eq!(logged("console.log(1 !== 2);"), vec!["true"]);
    }

    #[test]
    fn test_short_circuit_yields_operand() {
        assert_eq!(logged("console.log(null && boom());"), vec!["null"]);
        assert_eq!(logged("console.log('x' || boom());"), vec!["x"]);
    }

    #[test]
    fn test_undefined_variable_error() {
        let err = eval_source("console.log(missing);").err().expect("lookup fails");
        assert!(err.to_string().contains("missing is not defined"));
    }

    #[test]
    fn test_calling_non_function() {
        let err = eval_source("let x = 1; x();").err().expect("call fails");
        assert!(err.to_string().contains("not a function"));
    }

    #[test]
    fn test_assignment_evaluates_to_value() {
        assert_eq!(logged("let x = 1; console.log(x = 5);"), vec!["5"]);
    }

    #[test]
    fn test_arrow_function_call() {
        assert_eq!(
            logged("let double = (n) => n * 2; console.log(double(21));"),
            vec!["42"]
        );
    }
}
