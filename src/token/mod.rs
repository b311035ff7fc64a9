use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Filter predicates (comparisons, boolean connectives, membership tests).
pub mod filter;

pub use filter::{ComparisonType, FilterToken, LogicalOperator};

/// A node of a tokenized SQL statement.
///
/// Equality, ordering and hashing are structural. Children whose order carries
/// no meaning in SQL are kept in a [`BTreeSet`], so two trees parsed from
/// statements that differ only in sibling order compare equal, and iteration
/// over children is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Root of a single `SELECT`.
    SelectStatement(BTreeSet<Token>),
    /// Projected items of a `SELECT`.
    ColumnList(BTreeSet<Token>),
    /// A plain column reference, possibly qualified (`city.name`).
    Column(String),
    /// `*` in a projection or function argument.
    Wildcard,
    /// Relations listed in `FROM`.
    FromList(BTreeSet<Token>),
    /// A table identifier, possibly schema-qualified.
    TableName(String),
    /// A subquery used as a relation in `FROM`.
    DerivedTable(Box<Token>),
    /// Two relations combined by a join operator.
    Join(JoinToken),
    /// The `WHERE` predicate.
    WhereClause(Box<Token>),
    /// A predicate.
    Filter(FilterToken),
    /// Any constant or bind placeholder. The value is erased.
    Literal,
    /// A function call with positional arguments.
    Function {
        /// Lowercased function name.
        name: String,
        /// Argument shapes, in call order.
        arguments: Vec<Token>,
    },
    /// An operator application that is not a predicate (arithmetic, concatenation, ...).
    Expression {
        /// Operator as rendered by the SQL grammar.
        operator: String,
        /// Operand shapes, in source order.
        operands: Vec<Token>,
    },
    /// A scalar or table subquery used inside an expression.
    Subquery(Box<Token>),
    /// `UNION`, `EXCEPT` or `INTERSECT` of two query bodies.
    SetOperation {
        /// Operator including its quantifier, e.g. `UNION ALL`.
        operator: String,
        /// Left query body.
        left: Box<Token>,
        /// Right query body.
        right: Box<Token>,
        /// Query-level clauses applied to the whole set operation.
        clauses: BTreeSet<Token>,
    },
    /// `SELECT DISTINCT`.
    Distinct,
    /// `GROUP BY` keys.
    GroupBy(BTreeSet<Token>),
    /// The `HAVING` predicate.
    Having(Box<Token>),
    /// `ORDER BY` keys, in significance order.
    OrderBy(Vec<SortKey>),
    /// `LIMIT`, `OFFSET` or `FETCH`. Only presence is shape.
    Limit,
    /// A construct without a dedicated token, kept verbatim.
    Unrecognized(String),
}

/// Discriminant of a [`Token`], used for typed tree searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// [`Token::SelectStatement`]
    SelectStatement,
    /// [`Token::ColumnList`]
    ColumnList,
    /// [`Token::Column`]
    Column,
    /// [`Token::Wildcard`]
    Wildcard,
    /// [`Token::FromList`]
    FromList,
    /// [`Token::TableName`]
    TableName,
    /// [`Token::DerivedTable`]
    DerivedTable,
    /// [`Token::Join`]
    Join,
    /// [`Token::WhereClause`]
    WhereClause,
    /// [`Token::Filter`]
    Filter,
    /// [`Token::Literal`]
    Literal,
    /// [`Token::Function`]
    Function,
    /// [`Token::Expression`]
    Expression,
    /// [`Token::Subquery`]
    Subquery,
    /// [`Token::SetOperation`]
    SetOperation,
    /// [`Token::Distinct`]
    Distinct,
    /// [`Token::GroupBy`]
    GroupBy,
    /// [`Token::Having`]
    Having,
    /// [`Token::OrderBy`]
    OrderBy,
    /// [`Token::Limit`]
    Limit,
    /// [`Token::Unrecognized`]
    Unrecognized,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::SelectStatement => "SELECT statement",
            TokenKind::ColumnList => "column list",
            TokenKind::Column => "column",
            TokenKind::Wildcard => "wildcard",
            TokenKind::FromList => "from list",
            TokenKind::TableName => "table name",
            TokenKind::DerivedTable => "derived table",
            TokenKind::Join => "join",
            TokenKind::WhereClause => "where clause",
            TokenKind::Filter => "filter",
            TokenKind::Literal => "literal",
            TokenKind::Function => "function",
            TokenKind::Expression => "expression",
            TokenKind::Subquery => "subquery",
            TokenKind::SetOperation => "set operation",
            TokenKind::Distinct => "distinct",
            TokenKind::GroupBy => "group by",
            TokenKind::Having => "having",
            TokenKind::OrderBy => "order by",
            TokenKind::Limit => "limit",
            TokenKind::Unrecognized => "unrecognized construct",
        };
        f.write_str(name)
    }
}

/// Join kinds distinguished by the token model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// `[INNER] JOIN`
    Inner,
    /// `NATURAL JOIN`
    Natural,
    /// `LEFT [OUTER] JOIN`
    LeftOuter,
    /// `RIGHT [OUTER] JOIN`
    RightOuter,
    /// `FULL [OUTER] JOIN`
    FullOuter,
    /// `CROSS JOIN`
    Cross,
    /// Dialect-specific joins (semi, anti, apply, ...).
    Other,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Natural => write!(f, "NATURAL"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
            JoinType::FullOuter => write!(f, "FULL OUTER"),
            JoinType::Cross => write!(f, "CROSS"),
            JoinType::Other => write!(f, "OTHER"),
        }
    }
}

/// A join of two relations. Multi-way joins nest on the left side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JoinToken {
    /// Left relation: a table, derived table, or a nested join.
    pub left: Box<Token>,
    /// Join operator.
    pub join_type: JoinType,
    /// Right relation.
    pub right: Box<Token>,
    /// Join condition (`ON` or `USING`), absent for natural and cross joins.
    pub on_clause: Option<Box<Token>>,
}

impl JoinToken {
    /// Create a join without a condition.
    pub fn new(left: Token, join_type: JoinType, right: Token) -> Self {
        Self {
            left: Box::new(left),
            join_type,
            right: Box::new(right),
            on_clause: None,
        }
    }

    /// Attach a join condition.
    #[must_use]
    pub fn with_on_clause(mut self, on_clause: Token) -> Self {
        self.on_clause = Some(Box::new(on_clause));
        self
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Sort expression shape.
    pub key: Token,
    /// `true` for `DESC`.
    pub descending: bool,
}

impl Token {
    /// Plain column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Token::Column(name.into())
    }

    /// Table reference.
    pub fn table(name: impl Into<String>) -> Self {
        Token::TableName(name.into())
    }

    /// Binary comparison predicate.
    pub fn comparison(left: Token, comparison: ComparisonType, right: Token) -> Self {
        Token::Filter(FilterToken::Comparison {
            left: Box::new(left),
            comparison,
            right: Box::new(right),
        })
    }

    /// The discriminant of this token.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::SelectStatement(_) => TokenKind::SelectStatement,
            Token::ColumnList(_) => TokenKind::ColumnList,
            Token::Column(_) => TokenKind::Column,
            Token::Wildcard => TokenKind::Wildcard,
            Token::FromList(_) => TokenKind::FromList,
            Token::TableName(_) => TokenKind::TableName,
            Token::DerivedTable(_) => TokenKind::DerivedTable,
            Token::Join(_) => TokenKind::Join,
            Token::WhereClause(_) => TokenKind::WhereClause,
            Token::Filter(_) => TokenKind::Filter,
            Token::Literal => TokenKind::Literal,
            Token::Function { .. } => TokenKind::Function,
            Token::Expression { .. } => TokenKind::Expression,
            Token::Subquery(_) => TokenKind::Subquery,
            Token::SetOperation { .. } => TokenKind::SetOperation,
            Token::Distinct => TokenKind::Distinct,
            Token::GroupBy(_) => TokenKind::GroupBy,
            Token::Having(_) => TokenKind::Having,
            Token::OrderBy(_) => TokenKind::OrderBy,
            Token::Limit => TokenKind::Limit,
            Token::Unrecognized(_) => TokenKind::Unrecognized,
        }
    }

    /// Direct children in deterministic order.
    pub fn children(&self) -> Vec<&Token> {
        match self {
            Token::SelectStatement(children)
            | Token::ColumnList(children)
            | Token::FromList(children)
            | Token::GroupBy(children) => children.iter().collect(),
            Token::DerivedTable(inner)
            | Token::WhereClause(inner)
            | Token::Subquery(inner)
            | Token::Having(inner) => vec![inner.as_ref()],
            Token::Join(join) => {
                let mut children = vec![join.left.as_ref(), join.right.as_ref()];
                children.extend(join.on_clause.as_deref());
                children
            }
            Token::Filter(filter) => filter.children(),
            Token::Function { arguments, .. } => arguments.iter().collect(),
            Token::Expression { operands, .. } => operands.iter().collect(),
            Token::SetOperation {
                left,
                right,
                clauses,
                ..
            } => {
                let mut children = vec![left.as_ref(), right.as_ref()];
                children.extend(clauses.iter());
                children
            }
            Token::OrderBy(keys) => keys.iter().map(|sort| &sort.key).collect(),
            Token::Column(_)
            | Token::Wildcard
            | Token::TableName(_)
            | Token::Literal
            | Token::Distinct
            | Token::Limit
            | Token::Unrecognized(_) => Vec::new(),
        }
    }

    /// Depth-first, pre-order search for the first token of `kind`,
    /// starting with `self`.
    pub fn find_first_of_kind(&self, kind: TokenKind) -> Option<&Token> {
        if self.kind() == kind {
            return Some(self);
        }
        self.children()
            .into_iter()
            .find_map(|child| child.find_first_of_kind(kind))
    }

    /// The statement-level token of a tokenized query: the root itself when
    /// it is a `SELECT` or a set operation, otherwise the first nested `SELECT`.
    pub fn statement_root(&self) -> Option<&Token> {
        match self.kind() {
            TokenKind::SelectStatement | TokenKind::SetOperation => Some(self),
            _ => self.find_first_select(),
        }
    }

    /// First `SELECT` in pre-order, starting with `self`.
    pub fn find_first_select(&self) -> Option<&Token> {
        self.find_first_of_kind(TokenKind::SelectStatement)
    }

    /// Children of a `SELECT` root, or `None` for every other token.
    pub fn select_children(&self) -> Option<&BTreeSet<Token>> {
        match self {
            Token::SelectStatement(children) => Some(children),
            _ => None,
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Token>,
) -> fmt::Result {
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::SelectStatement(children) => {
                write!(f, "select(")?;
                write_joined(f, children)?;
                write!(f, ")")
            }
            Token::ColumnList(items) => {
                write!(f, "columns[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Token::Column(name) | Token::TableName(name) => write!(f, "{name}"),
            Token::Wildcard => write!(f, "*"),
            Token::FromList(items) => {
                write!(f, "from[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Token::DerivedTable(inner) | Token::Subquery(inner) => write!(f, "({inner})"),
            Token::Join(join) => {
                write!(f, "({} {} JOIN {}", join.left, join.join_type, join.right)?;
                if let Some(on) = &join.on_clause {
                    write!(f, " ON {on}")?;
                }
                write!(f, ")")
            }
            Token::WhereClause(filter) => write!(f, "where({filter})"),
            Token::Filter(filter) => write!(f, "{filter}"),
            Token::Literal => write!(f, "?"),
            Token::Function { name, arguments } => {
                write!(f, "{name}(")?;
                write_joined(f, arguments)?;
                write!(f, ")")
            }
            Token::Expression { operator, operands } => match operands.as_slice() {
                [single] => write!(f, "{operator} {single}"),
                [left, right] => write!(f, "({left} {operator} {right})"),
                _ => {
                    write!(f, "{operator}(")?;
                    write_joined(f, operands)?;
                    write!(f, ")")
                }
            },
            Token::SetOperation {
                operator,
                left,
                right,
                clauses,
            } => {
                write!(f, "({left} {operator} {right})")?;
                for clause in clauses {
                    write!(f, " {clause}")?;
                }
                Ok(())
            }
            Token::Distinct => write!(f, "distinct"),
            Token::GroupBy(keys) => {
                write!(f, "group_by[")?;
                write_joined(f, keys)?;
                write!(f, "]")
            }
            Token::Having(filter) => write!(f, "having({filter})"),
            Token::OrderBy(keys) => {
                write!(f, "order_by[")?;
                for (idx, sort) in keys.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", sort.key)?;
                    if sort.descending {
                        write!(f, " DESC")?;
                    }
                }
                write!(f, "]")
            }
            Token::Limit => write!(f, "limit"),
            Token::Unrecognized(sql) => write!(f, "unrecognized({sql})"),
        }
    }
}
