//! Expression trees.
//!
//! Expressions are immutable values: transformation ([`Expr::inline`]) always
//! builds a new tree. Emission produces HLSL text; no arithmetic is ever
//! evaluated here, even when both operands of a binary are literals, since
//! constant folding belongs to the downstream shader compiler.

use std::collections::HashMap;

use crate::codegen::instruction::VarDecl;

/// Maps a variable name to the expression that replaces references to it
/// during the inlining pass.
pub type SubstitutionTable = HashMap<String, Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal already formatted for emission (`1.0`, `true`, `float2(0.0, 0.0)`).
    Constant(String),
    /// A reference to a previously declared variable, resolved at emission.
    Variable(String),
    /// A bare operator token, only meaningful inside a [`Expr::Sequence`].
    Operator(String),
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    /// A function call; `out_decls` are out-parameter declarations emitted as
    /// statements immediately before the instruction that contains the call.
    Call {
        name: String,
        args: Vec<Expr>,
        out_decls: Vec<VarDecl>,
    },
    /// Parts concatenated with spaces; used for constructs with no dedicated
    /// tree shape, e.g. the ternary conditional.
    Sequence(Vec<Expr>),
    /// Marks a pure alias: the inlining pass substitutes it at every use site
    /// and drops the defining instruction.
    Inlineable(Box<Expr>),
}

impl Expr {
    pub fn constant(text: impl Into<String>) -> Expr {
        Expr::Constant(text.into())
    }

    pub fn variable(name: impl Into<String>) -> Expr {
        Expr::Variable(name.into())
    }

    pub fn binary(left: Expr, op: impl Into<String>, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op: op.into(),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.into(),
            args,
            out_decls: Vec::new(),
        }
    }

    pub fn inlineable(inner: Expr) -> Expr {
        Expr::Inlineable(Box::new(inner))
    }

    /// Renders the expression as inline HLSL text.
    pub fn emit(&self) -> String {
        match self {
            Expr::Constant(s) | Expr::Variable(s) | Expr::Operator(s) => s.clone(),
            Expr::Binary { left, op, right } => {
                format!("({} {} {})", left.emit(), op, right.emit())
            }
            Expr::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(Expr::emit).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Sequence(parts) => {
                let parts: Vec<String> = parts.iter().map(Expr::emit).collect();
                parts.join(" ")
            }
            Expr::Inlineable(inner) => inner.emit(),
        }
    }

    /// Collects out-parameter declarations anywhere in the tree, in emission
    /// order, so the containing instruction can declare them first.
    pub fn collect_out_decls(&self, out: &mut Vec<VarDecl>) {
        match self {
            Expr::Constant(_) | Expr::Variable(_) | Expr::Operator(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_out_decls(out);
                right.collect_out_decls(out);
            }
            Expr::Call {
                args, out_decls, ..
            } => {
                for a in args {
                    a.collect_out_decls(out);
                }
                out.extend(out_decls.iter().cloned());
            }
            Expr::Sequence(parts) => {
                for p in parts {
                    p.collect_out_decls(out);
                }
            }
            Expr::Inlineable(inner) => inner.collect_out_decls(out),
        }
    }

    /// Rebuilds the tree with every [`Expr::Variable`] that matches a table
    /// key replaced by the table's expression, re-resolved recursively so
    /// alias chains collapse to their ultimate source. Two-constant binaries
    /// are left as-is.
    pub fn inline(&self, table: &SubstitutionTable) -> Expr {
        match self {
            Expr::Constant(_) | Expr::Operator(_) => self.clone(),
            Expr::Variable(name) => match table.get(name) {
                Some(replacement) => replacement.inline(table),
                None => self.clone(),
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(left.inline(table)),
                op: op.clone(),
                right: Box::new(right.inline(table)),
            },
            Expr::Call {
                name,
                args,
                out_decls,
            } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|a| a.inline(table)).collect(),
                out_decls: out_decls.clone(),
            },
            Expr::Sequence(parts) => {
                Expr::Sequence(parts.iter().map(|p| p.inline(table)).collect())
            }
            Expr::Inlineable(inner) => Expr::Inlineable(Box::new(inner.inline(table))),
        }
    }
}
