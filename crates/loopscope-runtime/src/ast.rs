//! Abstract Syntax Tree (AST) definitions
//!
//! AST for the instrumented JavaScript subset. Every node carries a span so
//! the simulator can attribute stack frames and task cards to source lines
//! and cut code snippets straight out of the original text.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Top-level program: a sequence of statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    FunctionDecl(FunctionDecl),
    Expr(ExprStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    If(IfStmt),
    Block(Block),
}

impl Stmt {
    /// Span covering the whole statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::FunctionDecl(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Block(s) => s.span,
        }
    }
}

/// Variable declaration kind (`let`, `const`, `var`)
///
/// All three behave identically in the subset: a binding in the current
/// scope. Const reassignment is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

/// Variable declaration: `let name = init;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: DeclKind,
    pub name: Identifier,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Function declaration: `function name(params) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub function: FunctionExpr,
    pub span: Span,
}

/// Expression statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// Return statement: `return expr?;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// Throw statement: `throw expr;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

/// If statement with optional else branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

/// Braced block of statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal, Span),
    Identifier(Identifier),
    Assign(Box<AssignExpr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    Member(Box<MemberExpr>),
    New(Box<NewExpr>),
    Function(Box<FunctionExpr>),
}

impl Expr {
    /// Span covering the whole expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span) => *span,
            Expr::Identifier(id) => id.span,
            Expr::Assign(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Function(e) => e.span,
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
}

/// Identifier with source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Assignment to a name: `x = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignExpr {
    pub target: Identifier,
    pub value: Expr,
    pub span: Span,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `==` (treated as strict in the subset)
    Eq,
    /// `===`
    StrictEq,
    /// `!=`
    Ne,
    /// `!==`
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Binary expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
    pub span: Span,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Unary expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
    pub span: Span,
}

/// Call expression: `callee(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Member access: `object.property`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: Expr,
    pub property: Identifier,
    pub span: Span,
}

/// Constructor call: `new Callee(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Function expression: arrow function or anonymous `function` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub params: Vec<Identifier>,
    pub body: FunctionBody,
    pub span: Span,
}

/// Function body: a block, or a single expression (concise arrow body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_span() {
        let expr = Expr::Literal(Literal::Number(1.0), Span::new(3, 4));
        assert_eq!(expr.span(), Span::new(3, 4));

        let id = Expr::Identifier(Identifier {
            name: "x".to_string(),
            span: Span::new(0, 1),
        });
        assert_eq!(id.span(), Span::new(0, 1));
    }

    #[test]
    fn test_stmt_span() {
        let stmt = Stmt::Expr(ExprStmt {
            expr: Expr::Literal(Literal::Null, Span::new(0, 4)),
            span: Span::new(0, 5),
        });
        assert_eq!(stmt.span(), Span::new(0, 5));
    }

    #[test]
    fn test_ast_serializes() {
        let program = Program {
            body: vec![Stmt::Expr(ExprStmt {
                expr: Expr::Literal(Literal::String("Start".to_string()), Span::new(0, 7)),
                span: Span::new(0, 8),
            })],
        };
        let json = serde_json::to_string(&program).unwrap();
        assert!(json.contains("Start"));
    }
}
