//! Abstract syntax tree produced by the parser and consumed by the compiler.
//!
//! Nodes are plain sum types owned down the tree: a parent owns its children
//! and traversal borrows. Every node renders back to source-like text via
//! `Display`, which the parser tests lean on.

use std::fmt;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Bang,
    Minus,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOperator::Bang => write!(f, "!"),
            PrefixOperator::Minus => write!(f, "-"),
        }
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Lt,
    Gt,
    Eq,
    NotEq,
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfixOperator::Plus => write!(f, "+"),
            InfixOperator::Minus => write!(f, "-"),
            InfixOperator::Asterisk => write!(f, "*"),
            InfixOperator::Slash => write!(f, "/"),
            InfixOperator::Lt => write!(f, "<"),
            InfixOperator::Gt => write!(f, ">"),
            InfixOperator::Eq => write!(f, "=="),
            InfixOperator::NotEq => write!(f, "!="),
        }
    }
}

/// An ordered sequence of statements, as found in function bodies, `if`
/// branches, and `match` arms.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

/// A single `match` arm: pattern and consequence.
///
/// `pattern` of `None` is the wildcard `_`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Option<Expression>,
    pub consequence: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    Prefix {
        op: PrefixOperator,
        rhs: Box<Expression>,
    },
    Infix {
        op: InfixOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Match {
        scrutinee: Box<Expression>,
        arms: Vec<MatchArm>,
    },
    Function {
        name: Option<String>,
        parameters: Vec<String>,
        body: BlockStatement,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// The expression's variant name, used in `cannot compile` diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Expression::Integer(_) => "Integer",
            Expression::Float(_) => "Float",
            Expression::Bool(_) => "Bool",
            Expression::Str(_) => "String",
            Expression::Ident(_) => "Ident",
            Expression::Prefix { .. } => "Prefix",
            Expression::Infix { .. } => "Infix",
            Expression::If { .. } => "If",
            Expression::Match { .. } => "Match",
            Expression::Function { .. } => "Function",
            Expression::Call { .. } => "Call",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer(value) => write!(f, "{}", value),
            Expression::Float(value) => write!(f, "{}", value),
            Expression::Bool(value) => write!(f, "{}", value),
            Expression::Str(value) => write!(f, "\"{}\"", value),
            Expression::Ident(name) => write!(f, "{}", name),
            Expression::Prefix { op, rhs } => write!(f, "({}{})", op, rhs),
            Expression::Infix { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {} {{ {} }}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {{ {} }}", alternative)?;
                }
                Ok(())
            }
            Expression::Match { scrutinee, arms } => {
                write!(f, "match {} {{ ", scrutinee)?;
                for arm in arms {
                    match &arm.pattern {
                        Some(pattern) => write!(f, "{} => {{ {} }}, ", pattern, arm.consequence)?,
                        None => write!(f, "_ => {{ {} }}, ", arm.consequence)?,
                    }
                }
                write!(f, "}}")
            }
            Expression::Function {
                name,
                parameters,
                body,
            } => {
                write!(f, "fn")?;
                if let Some(name) = name {
                    write!(f, " {}", name)?;
                }
                write!(f, "({}) {{ {} }}", parameters.join(", "), body)
            }
            Expression::Call { callee, arguments } => {
                let arguments: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", callee, arguments.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { name: String, value: Expression },
    Return(Expression),
    Expression(Expression),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {} = {};", name, value),
            Statement::Return(value) => write!(f, "return {};", value),
            Statement::Expression(value) => write!(f, "{}", value),
        }
    }
}

/// A parsed program: the root of the tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}
