//! Statement execution

use super::{ControlFlow, Interpreter};
use crate::ast::{Block, Stmt};
use crate::value::{EnvRef, Environment, RuntimeError, Value};

impl Interpreter {
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VarDecl(decl) => {
                let value = match &decl.init {
                    Some(init) => self.eval_expr(init, env)?,
                    None => Value::Undefined,
                };
                env.define(decl.name.name.clone(), value);
                Ok(())
            }
            Stmt::FunctionDecl(decl) => {
                let closure =
                    self.make_closure(&decl.function, env, Some(decl.name.name.clone()));
                env.define(decl.name.name.clone(), closure);
                Ok(())
            }
            Stmt::Expr(stmt) => {
                self.eval_expr(&stmt.expr, env)?;
                Ok(())
            }
            Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                self.control = ControlFlow::Return(value);
                Ok(())
            }
            Stmt::Throw(stmt) => {
                let value = self.eval_expr(&stmt.value, env)?;
                Err(RuntimeError::Thrown {
                    value,
                    span: stmt.span,
                })
            }
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.condition, env)?.is_truthy() {
                    self.exec_stmt(&stmt.then_branch, env)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(())
                }
            }
            Stmt::Block(block) => self.exec_block(block, env),
        }
    }

    /// Run a block in a fresh child scope, stopping early on `return`
    pub(crate) fn exec_block(&mut self, block: &Block, env: &EnvRef) -> Result<(), RuntimeError> {
        let scope = Environment::child(env.clone());
        for stmt in &block.statements {
            self.exec_stmt(stmt, &scope)?;
            if matches!(self.control, ControlFlow::Return(_)) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn logged(source: &str) -> Vec<String> {
        let mut interp = Interpreter::new(source);
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        interp.run_program(&program).expect("runtime error");
        interp.console.to_vec()
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            logged("if (1 < 2) { console.log('yes'); } else { console.log('no'); }"),
            vec!["yes"]
        );
        assert_eq!(
            logged("if (false) { console.log('yes'); } else { console.log('no'); }"),
            vec!["no"]
        );
    }

    #[test]
    fn test_block_scoping_shadows() {
        assert_eq!(
            logged("let x = 'outer'; { let x = 'inner'; console.log(x); } console.log(x);"),
            vec!["inner", "outer"]
        );
    }

    #[test]
    fn test_var_decl_without_init() {
        assert_eq!(logged("let x; console.log(x);"), vec!["undefined"]);
    }

    #[test]
    fn test_throw_surfaces_value() {
        let mut interp = Interpreter::new("");
        let source = "throw 'custom failure';";
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, _) = Parser::new(tokens).parse();
        let err = interp.run_program(&program).unwrap_err();
        assert_eq!(err.to_string(), "custom failure");
    }

    #[test]
    fn test_return_inside_nested_block() {
        assert_eq!(
            logged(
                "function pick(n) { if (n > 0) { return 'pos'; } return 'other'; }\n\
                 console.log(pick(3));\n\
                 console.log(pick(-1));"
            ),
            vec!["pos", "other"]
        );
    }
}
