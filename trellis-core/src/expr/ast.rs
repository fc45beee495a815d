//! Expression syntax tree.
//!
//! The tree is plain data (`Send + Sync`), so compiled programs can be
//! cached and shared across threads; runtime values are only created when a
//! tree is evaluated.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
}

impl AssignOp {
    /// The binary operator applied by a compound assignment.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinaryOp::Add),
            Self::Sub => Some(BinaryOp::Sub),
            Self::Mul => Some(BinaryOp::Mul),
            Self::Div => Some(BinaryOp::Div),
            Self::Rem => Some(BinaryOp::Rem),
            Self::Exp => Some(BinaryOp::Exp),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Static(String),
    Computed(Expr),
    /// `...value`; the paired expression is the spread operand.
    Spread,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    This,
    Array(Vec<Expr>),
    Object(Vec<(PropKey, Expr)>),
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Function(Arc<FunctionDef>),
    Sequence(Vec<Expr>),
    /// `` `a${b}c` ``: `quasis` has one more entry than `exprs`.
    Template {
        quasis: Vec<Arc<str>>,
        exprs: Vec<Expr>,
    },
    /// `...value` inside an array literal or an argument list.
    Spread(Box<Expr>),
}

impl Expr {
    pub fn str(s: &str) -> Self {
        Self::Literal(Literal::Str(Arc::from(s)))
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Ident(_) | Self::Member { optional: false, .. })
    }
}

/// A function parameter: a name, or an object / array destructuring
/// pattern of plain names.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Ident(String),
    /// `{ key: binding, ... }`; shorthand keys bind to themselves.
    Object(Vec<(String, String)>),
    Array(Vec<String>),
    /// `param = default`, used when the argument is `undefined`.
    Default(Box<Param>, Expr),
    /// `...rest`: the remaining arguments as a list. Always last.
    Rest(String),
}

impl Param {
    /// Every name the parameter introduces.
    pub fn bindings(&self) -> Vec<&str> {
        match self {
            Self::Ident(name) => vec![name.as_str()],
            Self::Object(pairs) => pairs.iter().map(|(_, b)| b.as_str()).collect(),
            Self::Array(names) => names.iter().map(String::as_str).collect(),
            Self::Default(inner, _) => inner.bindings(),
            Self::Rest(name) => vec![name.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<Param>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Var(Vec<(String, Option<Expr>)>),
    Empty,
}

/// A parsed statement list, such as a render procedure body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}
