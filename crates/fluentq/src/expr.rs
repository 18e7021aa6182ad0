//! Condition expressions and the condition tree.
//!
//! [`Expr`] is the tagged-variant model for everything that can appear in a
//! WHERE/HAVING/ON position. [`ConditionTree`] is an ordered sequence of
//! expressions, each carrying the combinator that joins it to the previous
//! node; rendering walks left to right and parenthesizes nested groups so
//! the output never depends on the engine's operator precedence.

use crate::dialect::Dialect;
use crate::ident::ColumnRef;
use crate::operand::Operand;
use crate::statement::{RawFragment, SqlWriter};
use crate::value::Value;

/// How a condition node combines with the node before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Comparison operators accepted by `where_cmp`/`having_cmp`.
///
/// Returns the canonical spelling, or `None` for anything outside the
/// closed set (which the builder reports as an invalid argument).
pub(crate) fn normalize_op(op: &str) -> Option<&'static str> {
    const OPS: &[&str] = &[
        "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "ILIKE", "NOT ILIKE",
    ];
    let upper = op.trim().to_ascii_uppercase();
    OPS.iter().find(|candidate| **candidate == upper).copied()
}

/// A condition expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Raw SQL fragment spliced verbatim.
    Raw(RawFragment),
    /// `column op operand`
    Compare {
        column: ColumnRef,
        op: &'static str,
        value: Operand,
    },
    /// `column IS [NOT] NULL`
    NullCheck { column: ColumnRef, negated: bool },
    /// `column [NOT] IN (?, ...)`
    InList {
        column: ColumnRef,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column [NOT] IN (SELECT ...)`
    InSubquery {
        column: ColumnRef,
        query: RawFragment,
        negated: bool,
    },
    /// `column [NOT] BETWEEN ? AND ?`
    Between {
        column: ColumnRef,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `column [NOT] LIKE ?`
    Like {
        column: ColumnRef,
        pattern: Value,
        negated: bool,
    },
    /// `[NOT] EXISTS (SELECT ...)`
    Exists { query: RawFragment, negated: bool },
    /// A nested group of conditions.
    Group(ConditionTree),
    /// Structural negation: `NOT (...)`.
    Not(Box<Expr>),
}

impl Expr {
    /// Negate this expression.
    ///
    /// Null checks, IN lists, BETWEEN, LIKE and EXISTS flip in place
    /// (`IS NOT NULL`, `NOT IN (...)`, `NOT BETWEEN`, ...); everything
    /// else, including groups, is wrapped in `NOT (...)` as-is — never
    /// distributed over the group's children.
    pub fn negate(self) -> Expr {
        match self {
            Expr::NullCheck { column, negated } => Expr::NullCheck {
                column,
                negated: !negated,
            },
            Expr::InList {
                column,
                values,
                negated,
            } => Expr::InList {
                column,
                values,
                negated: !negated,
            },
            Expr::InSubquery {
                column,
                query,
                negated,
            } => Expr::InSubquery {
                column,
                query,
                negated: !negated,
            },
            Expr::Between {
                column,
                low,
                high,
                negated,
            } => Expr::Between {
                column,
                low,
                high,
                negated: !negated,
            },
            Expr::Like {
                column,
                pattern,
                negated,
            } => Expr::Like {
                column,
                pattern,
                negated: !negated,
            },
            Expr::Exists { query, negated } => Expr::Exists {
                query,
                negated: !negated,
            },
            other => Expr::Not(Box::new(other)),
        }
    }

    pub(crate) fn write_sql(&self, w: &mut SqlWriter, dialect: Dialect) {
        match self {
            Expr::Raw(frag) => w.push_fragment(frag),
            Expr::Compare { column, op, value } => {
                column.write_sql(w.sql_mut(), dialect);
                w.push_char(' ');
                w.push_str(op);
                w.push_char(' ');
                value.write_sql(w, dialect);
            }
            Expr::NullCheck { column, negated } => {
                column.write_sql(w.sql_mut(), dialect);
                w.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // An empty IN list can never match; an empty NOT IN always does.
                    w.push_str(if *negated { "1=1" } else { "1=0" });
                    return;
                }
                column.write_sql(w.sql_mut(), dialect);
                w.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.push_char(',');
                    }
                    w.push_value(value.clone());
                }
                w.push_char(')');
            }
            Expr::InSubquery {
                column,
                query,
                negated,
            } => {
                column.write_sql(w.sql_mut(), dialect);
                w.push_str(if *negated { " NOT IN " } else { " IN " });
                w.push_fragment(query);
            }
            Expr::Between {
                column,
                low,
                high,
                negated,
            } => {
                column.write_sql(w.sql_mut(), dialect);
                w.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                w.push_value(low.clone());
                w.push_str(" AND ");
                w.push_value(high.clone());
            }
            Expr::Like {
                column,
                pattern,
                negated,
            } => {
                column.write_sql(w.sql_mut(), dialect);
                w.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                w.push_value(pattern.clone());
            }
            Expr::Exists { query, negated } => {
                w.push_str(if *negated { "NOT EXISTS " } else { "EXISTS " });
                w.push_fragment(query);
            }
            Expr::Group(tree) => {
                if tree.len() > 1 {
                    w.push_char('(');
                    tree.write_sql(w, dialect);
                    w.push_char(')');
                } else {
                    tree.write_sql(w, dialect);
                }
            }
            Expr::Not(inner) => {
                w.push_str("NOT (");
                match &**inner {
                    // Avoid doubled parentheses around negated groups.
                    Expr::Group(tree) => tree.write_sql(w, dialect),
                    other => other.write_sql(w, dialect),
                }
                w.push_char(')');
            }
        }
    }
}

/// An ordered sequence of conditions, each joined to the previous one by
/// its own combinator. The first node's combinator is never rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionTree {
    nodes: Vec<(Combinator, Expr)>,
}

impl ConditionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn push(&mut self, combinator: Combinator, expr: Expr) {
        self.nodes.push((combinator, expr));
    }

    pub(crate) fn write_sql(&self, w: &mut SqlWriter, dialect: Dialect) {
        for (i, (combinator, expr)) in self.nodes.iter().enumerate() {
            if i > 0 {
                w.push_char(' ');
                w.push_str(combinator.keyword());
                w.push_char(' ');
            }
            expr.write_sql(w, dialect);
        }
    }
}
