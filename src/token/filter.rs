use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::Token;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    /// `=`
    Equal,
    /// `<>` / `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonType::Equal => write!(f, "="),
            ComparisonType::NotEqual => write!(f, "<>"),
            ComparisonType::LessThan => write!(f, "<"),
            ComparisonType::LessThanOrEqual => write!(f, "<="),
            ComparisonType::GreaterThan => write!(f, ">"),
            ComparisonType::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

/// Predicate shapes found in `ON`, `WHERE` and `HAVING`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterToken {
    /// `left <op> right`. Operand order is significant.
    Comparison {
        /// Left operand.
        left: Box<Token>,
        /// Operator.
        comparison: ComparisonType,
        /// Right operand.
        right: Box<Token>,
    },
    /// A flattened `AND`/`OR` chain. Operand order is not significant.
    Logical {
        /// Connective shared by every operand.
        operator: LogicalOperator,
        /// Operands of the chain.
        operands: BTreeSet<Token>,
    },
    /// `NOT <operand>`
    Not(Box<Token>),
    /// `<operand> IS [NOT] NULL`
    IsNull {
        /// Tested expression.
        operand: Box<Token>,
        /// `IS NOT NULL`.
        negated: bool,
    },
    /// `<operand> [NOT] IN (<list>)`
    InList {
        /// Tested expression.
        operand: Box<Token>,
        /// Distinct shapes of the list items.
        list: BTreeSet<Token>,
        /// `NOT IN`.
        negated: bool,
    },
    /// `<operand> [NOT] IN (SELECT ...)`
    InSubquery {
        /// Tested expression.
        operand: Box<Token>,
        /// Subquery shape.
        subquery: Box<Token>,
        /// `NOT IN`.
        negated: bool,
    },
    /// `<operand> [NOT] BETWEEN <low> AND <high>`
    Between {
        /// Tested expression.
        operand: Box<Token>,
        /// Lower bound.
        low: Box<Token>,
        /// Upper bound.
        high: Box<Token>,
        /// `NOT BETWEEN`.
        negated: bool,
    },
    /// `<operand> [NOT] [I]LIKE <pattern>`
    Like {
        /// Tested expression.
        operand: Box<Token>,
        /// Pattern shape.
        pattern: Box<Token>,
        /// `NOT LIKE`.
        negated: bool,
        /// `ILIKE`.
        case_insensitive: bool,
    },
    /// `[NOT] EXISTS (SELECT ...)`
    Exists {
        /// Subquery shape.
        subquery: Box<Token>,
        /// `NOT EXISTS`.
        negated: bool,
    },
}

impl FilterToken {
    /// Build a logical chain, flattening operands that already use `operator`.
    pub fn logical(operator: LogicalOperator, operands: impl IntoIterator<Item = Token>) -> Self {
        let mut flattened = BTreeSet::new();
        for operand in operands {
            match operand {
                Token::Filter(FilterToken::Logical {
                    operator: nested,
                    operands: inner,
                }) if nested == operator => flattened.extend(inner),
                other => {
                    flattened.insert(other);
                }
            }
        }
        FilterToken::Logical {
            operator,
            operands: flattened,
        }
    }

    pub(crate) fn children(&self) -> Vec<&Token> {
        match self {
            FilterToken::Comparison { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            FilterToken::Logical { operands, .. } => operands.iter().collect(),
            FilterToken::Not(operand) | FilterToken::IsNull { operand, .. } => {
                vec![operand.as_ref()]
            }
            FilterToken::InList { operand, list, .. } => {
                let mut children = vec![operand.as_ref()];
                children.extend(list.iter());
                children
            }
            FilterToken::InSubquery {
                operand, subquery, ..
            } => vec![operand.as_ref(), subquery.as_ref()],
            FilterToken::Between {
                operand, low, high, ..
            } => vec![operand.as_ref(), low.as_ref(), high.as_ref()],
            FilterToken::Like {
                operand, pattern, ..
            } => vec![operand.as_ref(), pattern.as_ref()],
            FilterToken::Exists { subquery, .. } => vec![subquery.as_ref()],
        }
    }
}

fn not_prefix(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

impl fmt::Display for FilterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterToken::Comparison {
                left,
                comparison,
                right,
            } => write!(f, "{left} {comparison} {right}"),
            FilterToken::Logical { operator, operands } => {
                write!(f, "(")?;
                for (idx, operand) in operands.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " {operator} ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")
            }
            FilterToken::Not(operand) => write!(f, "NOT {operand}"),
            FilterToken::IsNull { operand, negated } => {
                write!(f, "{operand} IS {}NULL", not_prefix(*negated))
            }
            FilterToken::InList {
                operand,
                list,
                negated,
            } => {
                write!(f, "{operand} {}IN (", not_prefix(*negated))?;
                for (idx, item) in list.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            FilterToken::InSubquery {
                operand,
                subquery,
                negated,
            } => write!(f, "{operand} {}IN ({subquery})", not_prefix(*negated)),
            FilterToken::Between {
                operand,
                low,
                high,
                negated,
            } => write!(
                f,
                "{operand} {}BETWEEN {low} AND {high}",
                not_prefix(*negated)
            ),
            FilterToken::Like {
                operand,
                pattern,
                negated,
                case_insensitive,
            } => {
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{operand} {}{keyword} {pattern}", not_prefix(*negated))
            }
            FilterToken::Exists { subquery, negated } => {
                write!(f, "{}EXISTS ({subquery})", not_prefix(*negated))
            }
        }
    }
}
