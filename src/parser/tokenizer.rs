use std::collections::BTreeSet;

use sqlparser::ast::{
    GroupByExpr, Join, JoinConstraint, JoinOperator, OrderByKind, Query, Select, SelectItem,
    SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::{
    Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;

use crate::config::SqlDialect;
use crate::error::TokenizeError;
use crate::parser::expr::{expr_set, expr_token};
use crate::parser::names::normalize_qualified_name;
use crate::token::{JoinToken, JoinType, SortKey, Token};

/// Turns SQL text into token trees.
///
/// Stateless apart from the dialect choice; safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    dialect: SqlDialect,
}

impl Tokenizer {
    /// Create a tokenizer for the given dialect.
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    /// Dialect used by the SQL grammar.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Tokenize exactly one query statement.
    ///
    /// Stacked statements (`SELECT ...; DROP ...`) and statements other than
    /// queries are rejected.
    pub fn tokenize(&self, sql: &str) -> Result<Token, TokenizeError> {
        let dialect = grammar_dialect(self.dialect);
        let statements = Parser::parse_sql(dialect.as_ref(), sql)?;
        let [statement] = statements.as_slice() else {
            return Err(TokenizeError::StatementCount(statements.len()));
        };
        statement_token(statement)
    }
}

fn grammar_dialect(dialect: SqlDialect) -> Box<dyn Dialect> {
    match dialect {
        SqlDialect::Generic => Box::new(GenericDialect {}),
        SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
        SqlDialect::MySql => Box::new(MySqlDialect {}),
        SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
        SqlDialect::MsSql => Box::new(MsSqlDialect {}),
    }
}

fn statement_token(statement: &Statement) -> Result<Token, TokenizeError> {
    match statement {
        Statement::Query(query) => query_token(query),
        other => Err(TokenizeError::UnsupportedStatement(statement_keyword(
            &other.to_string(),
        ))),
    }
}

fn statement_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Query bodies that can be mapped to a statement-level token.
///
/// Subqueries appear as full queries (`EXISTS (...)`) or as bare set
/// expressions depending on their position in the grammar.
pub(crate) trait QueryShape {
    fn shape(&self) -> Result<Token, TokenizeError>;

    /// The shape, or the verbatim text when the body holds an unsupported
    /// construct. Used for nested positions, where failing the whole
    /// statement would be too strict and matching loosely too permissive.
    fn shape_or_verbatim(&self) -> Token
    where
        Self: std::fmt::Display,
    {
        self.shape()
            .unwrap_or_else(|_| Token::Unrecognized(self.to_string()))
    }
}

impl QueryShape for Query {
    fn shape(&self) -> Result<Token, TokenizeError> {
        query_token(self)
    }
}

impl QueryShape for SetExpr {
    fn shape(&self) -> Result<Token, TokenizeError> {
        set_expr_token(self)
    }
}

fn query_token(query: &Query) -> Result<Token, TokenizeError> {
    if query.with.is_some() {
        return Err(TokenizeError::UnsupportedStatement("WITH".to_string()));
    }

    let mut root = set_expr_token(&query.body)?;
    let clauses = query_clauses(query);
    match &mut root {
        Token::SelectStatement(children) | Token::SetOperation { clauses: children, .. } => {
            children.extend(clauses);
        }
        _ => {}
    }
    Ok(root)
}

fn query_clauses(query: &Query) -> Vec<Token> {
    let mut clauses = Vec::new();
    if let Some(order_by) = &query.order_by {
        let keys = match &order_by.kind {
            OrderByKind::Expressions(exprs) => exprs
                .iter()
                .map(|item| SortKey {
                    key: expr_token(&item.expr),
                    descending: item.options.asc == Some(false),
                })
                .collect(),
            OrderByKind::All(options) => vec![SortKey {
                key: Token::Wildcard,
                descending: options.asc == Some(false),
            }],
        };
        clauses.push(Token::OrderBy(keys));
    }
    if query.limit_clause.is_some() || query.fetch.is_some() {
        clauses.push(Token::Limit);
    }
    clauses
}

fn set_expr_token(body: &SetExpr) -> Result<Token, TokenizeError> {
    match body {
        SetExpr::Select(select) => Ok(select_token(select)),
        SetExpr::Query(query) => query_token(query),
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => Ok(Token::SetOperation {
            operator: format!("{op} {set_quantifier}").trim().to_string(),
            left: Box::new(set_expr_token(left)?),
            right: Box::new(set_expr_token(right)?),
            clauses: BTreeSet::new(),
        }),
        other => Err(TokenizeError::UnsupportedStatement(statement_keyword(
            &other.to_string(),
        ))),
    }
}

fn select_token(select: &Select) -> Token {
    let mut children = BTreeSet::new();

    let columns = select.projection.iter().map(select_item_token).collect();
    children.insert(Token::ColumnList(columns));

    if !select.from.is_empty() {
        let relations = select.from.iter().map(table_with_joins_token).collect();
        children.insert(Token::FromList(relations));
    }

    if let Some(selection) = &select.selection {
        children.insert(Token::WhereClause(Box::new(expr_token(selection))));
    }

    if select.distinct.is_some() {
        children.insert(Token::Distinct);
    }

    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
        GroupByExpr::Expressions(exprs, _) => {
            children.insert(Token::GroupBy(expr_set(exprs)));
        }
        GroupByExpr::All(_) => {
            children.insert(Token::GroupBy(BTreeSet::from([Token::Wildcard])));
        }
    }

    if let Some(having) = &select.having {
        children.insert(Token::Having(Box::new(expr_token(having))));
    }

    Token::SelectStatement(children)
}

/// First-level projection items. Aliases are not shape.
fn select_item_token(item: &SelectItem) -> Token {
    match item {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => expr_token(expr),
        SelectItem::Wildcard { .. } => Token::Wildcard,
        SelectItem::QualifiedWildcard { .. } => {
            Token::Column(normalize_qualified_name(&item.to_string()))
        }
    }
}

/// Fold `A JOIN B JOIN C` into `((A JOIN B) JOIN C)`.
fn table_with_joins_token(table: &TableWithJoins) -> Token {
    table
        .joins
        .iter()
        .fold(relation_token(&table.relation), |left, join| {
            join_token(left, join)
        })
}

fn relation_token(relation: &TableFactor) -> Token {
    match relation {
        TableFactor::Table { name, .. } => {
            Token::TableName(normalize_qualified_name(&name.to_string()))
        }
        TableFactor::Derived { subquery, .. } => {
            Token::DerivedTable(Box::new(subquery.shape_or_verbatim()))
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_token(table_with_joins),
        other => Token::Unrecognized(other.to_string()),
    }
}

fn join_token(left: Token, join: &Join) -> Token {
    let right = relation_token(&join.relation);
    let (join_type, constraint) = match &join.join_operator {
        JoinOperator::Join(constraint) | JoinOperator::Inner(constraint) => {
            (JoinType::Inner, Some(constraint))
        }
        JoinOperator::Left(constraint) | JoinOperator::LeftOuter(constraint) => {
            (JoinType::LeftOuter, Some(constraint))
        }
        JoinOperator::Right(constraint) | JoinOperator::RightOuter(constraint) => {
            (JoinType::RightOuter, Some(constraint))
        }
        JoinOperator::FullOuter(constraint) => (JoinType::FullOuter, Some(constraint)),
        JoinOperator::CrossJoin { .. } => (JoinType::Cross, None),
        _ => {
            return Token::Join(JoinToken::new(
                left,
                JoinType::Other,
                Token::Unrecognized(join.to_string()),
            ))
        }
    };

    let mut join_type = join_type;
    let on_clause = match constraint {
        Some(JoinConstraint::On(expr)) => Some(expr_token(expr)),
        Some(JoinConstraint::Using(columns)) => Some(Token::Expression {
            operator: "USING".to_string(),
            operands: columns
                .iter()
                .map(|column| Token::Column(normalize_qualified_name(&column.to_string())))
                .collect(),
        }),
        Some(JoinConstraint::Natural) => {
            if join_type == JoinType::Inner {
                join_type = JoinType::Natural;
            }
            None
        }
        Some(JoinConstraint::None) | None => None,
    };

    let token = JoinToken::new(left, join_type, right);
    Token::Join(match on_clause {
        Some(on) => token.with_on_clause(on),
        None => token,
    })
}
