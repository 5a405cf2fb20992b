//! Algebraic AST (spec.md §3 "AST nodes", §4.1/§4.5).
//!
//! Grounded on the shape of the teacher's `compiler/expr.rs`/`compiler/stmt.rs`
//! expression/statement trees, re-expressed as a plain tree instead of the
//! teacher's register-targeting `ExpDesc` (that machinery exists to emit
//! bytecode; a tree-walker evaluates the tree directly, so positions are
//! carried on nodes instead of being threaded through code generation).

use smol_str::SmolStr;
use std::rc::Rc;

use crate::lexer::Pos;

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attrib {
    None,
    Const,
    Close,
}

#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub params: Vec<SmolStr>,
    pub is_vararg: bool,
    pub body: Rc<Block>,
    pub pos: Pos,
    pub name_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, Sub, Mul, Div, IDiv, Mod, Pow,
    Concat,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or,
    BAnd, BOr, BXor, Shl, Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Len,
    BNot,
}

#[derive(Debug, Clone)]
pub enum Field {
    Positional(Expr),
    Named(SmolStr, Expr),
    Indexed(Expr, Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Nil,
    True,
    False,
    Int(i64),
    Float(f64),
    Str(Rc<[u8]>),
    Vararg(Pos),
    Name(SmolStr, Pos),
    Index { obj: Box<Expr>, key: Box<Expr>, pos: Pos },
    Call { func: Box<Expr>, args: Vec<Expr>, pos: Pos },
    MethodCall { obj: Box<Expr>, method: SmolStr, args: Vec<Expr>, pos: Pos },
    Function(Rc<FunctionBody>),
    Table(Vec<Field>, Pos),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, pos: Pos },
    Unary { op: UnOp, expr: Box<Expr>, pos: Pos },
    /// Parenthesized expressions always contribute exactly one value
    /// (spec.md §4.5 multi-return adjustment rules).
    Paren(Box<Expr>),
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Vararg(p) | Expr::Name(_, p) | Expr::Index { pos: p, .. }
            | Expr::Call { pos: p, .. } | Expr::MethodCall { pos: p, .. }
            | Expr::Table(_, p) | Expr::Binary { pos: p, .. } | Expr::Unary { pos: p, .. } => *p,
            Expr::Function(body) => body.pos,
            Expr::Paren(inner) => inner.pos(),
            _ => Pos::default(),
        }
    }

    /// Whether this expression can syntactically produce multiple values in
    /// the last position of an explist (calls and `...`).
    pub fn is_multi(&self) -> bool {
        matches!(self, Expr::Call { .. } | Expr::MethodCall { .. } | Expr::Vararg(_))
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Empty,
    Assign { targets: Vec<Expr>, values: Vec<Expr>, pos: Pos },
    Local { names: Vec<(SmolStr, Attrib)>, values: Vec<Expr>, pos: Pos },
    ExprStat(Expr),
    Label(SmolStr, Pos),
    Goto(SmolStr, Pos),
    Break(Pos),
    Do(Block),
    While { cond: Expr, body: Block, pos: Pos },
    Repeat { body: Block, cond: Expr, pos: Pos },
    If { arms: Vec<(Expr, Block)>, else_block: Option<Block>, pos: Pos },
    NumericFor { var: SmolStr, start: Expr, stop: Expr, step: Option<Expr>, body: Block, pos: Pos },
    GenericFor { names: Vec<SmolStr>, exprs: Vec<Expr>, body: Block, pos: Pos },
    FunctionDecl { target: Expr, body: Rc<FunctionBody>, pos: Pos },
    LocalFunction { name: SmolStr, body: Rc<FunctionBody>, pos: Pos },
    Return(Vec<Expr>, Pos),
}
