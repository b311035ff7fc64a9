use std::collections::BTreeSet;

use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, UnaryOperator,
};

use crate::parser::names::normalize_qualified_name;
use crate::parser::tokenizer::QueryShape;
use crate::token::{ComparisonType, FilterToken, LogicalOperator, Token};

/// Map an expression to its shape.
///
/// Column references become [`Token::Column`] only where they appear
/// directly; a column wrapped in a function call is part of the
/// [`Token::Function`] arguments instead. Constant values are erased into
/// [`Token::Literal`]. Constructs without a dedicated token are kept verbatim
/// as [`Token::Unrecognized`], so they only match their exact spelling.
pub fn expr_token(expr: &Expr) -> Token {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
            Token::Column(normalize_qualified_name(&expr.to_string()))
        }
        Expr::Value(_) | Expr::TypedString { .. } => Token::Literal,
        Expr::Nested(inner) => expr_token(inner),
        Expr::BinaryOp { left, op, right } => binary_token(left, op, right),
        Expr::UnaryOp { op, expr: operand } => unary_token(op, operand),
        Expr::IsNull(operand) => Token::Filter(FilterToken::IsNull {
            operand: Box::new(expr_token(operand)),
            negated: false,
        }),
        Expr::IsNotNull(operand) => Token::Filter(FilterToken::IsNull {
            operand: Box::new(expr_token(operand)),
            negated: true,
        }),
        Expr::InList {
            expr: operand,
            list,
            negated,
        } => Token::Filter(FilterToken::InList {
            operand: Box::new(expr_token(operand)),
            list: list.iter().map(expr_token).collect(),
            negated: *negated,
        }),
        Expr::InSubquery {
            expr: operand,
            subquery,
            negated,
        } => Token::Filter(FilterToken::InSubquery {
            operand: Box::new(expr_token(operand)),
            subquery: Box::new(subquery.shape_or_verbatim()),
            negated: *negated,
        }),
        Expr::Between {
            expr: operand,
            negated,
            low,
            high,
        } => Token::Filter(FilterToken::Between {
            operand: Box::new(expr_token(operand)),
            low: Box::new(expr_token(low)),
            high: Box::new(expr_token(high)),
            negated: *negated,
        }),
        Expr::Like {
            negated,
            expr: operand,
            pattern,
            ..
        } => like_token(operand, pattern, *negated, false),
        Expr::ILike {
            negated,
            expr: operand,
            pattern,
            ..
        } => like_token(operand, pattern, *negated, true),
        Expr::Exists { subquery, negated } => Token::Filter(FilterToken::Exists {
            subquery: Box::new(subquery.shape_or_verbatim()),
            negated: *negated,
        }),
        Expr::Subquery(query) => Token::Subquery(Box::new(query.shape_or_verbatim())),
        Expr::Function(function) => function_token(function),
        Expr::Cast {
            expr: operand,
            data_type,
            ..
        } => Token::Function {
            name: format!("cast as {}", data_type.to_string().to_ascii_lowercase()),
            arguments: vec![expr_token(operand)],
        },
        Expr::Tuple(items) => Token::Expression {
            operator: "ROW".to_string(),
            operands: items.iter().map(expr_token).collect(),
        },
        _ => Token::Unrecognized(expr.to_string()),
    }
}

fn comparison_type(op: &BinaryOperator) -> Option<ComparisonType> {
    match op {
        BinaryOperator::Eq => Some(ComparisonType::Equal),
        BinaryOperator::NotEq => Some(ComparisonType::NotEqual),
        BinaryOperator::Lt => Some(ComparisonType::LessThan),
        BinaryOperator::LtEq => Some(ComparisonType::LessThanOrEqual),
        BinaryOperator::Gt => Some(ComparisonType::GreaterThan),
        BinaryOperator::GtEq => Some(ComparisonType::GreaterThanOrEqual),
        _ => None,
    }
}

fn binary_token(left: &Expr, op: &BinaryOperator, right: &Expr) -> Token {
    let logical = match op {
        BinaryOperator::And => Some(LogicalOperator::And),
        BinaryOperator::Or => Some(LogicalOperator::Or),
        _ => None,
    };
    if let Some(operator) = logical {
        return Token::Filter(FilterToken::logical(
            operator,
            [expr_token(left), expr_token(right)],
        ));
    }

    if let Some(comparison) = comparison_type(op) {
        return Token::comparison(expr_token(left), comparison, expr_token(right));
    }

    Token::Expression {
        operator: op.to_string(),
        operands: vec![expr_token(left), expr_token(right)],
    }
}

fn unary_token(op: &UnaryOperator, operand: &Expr) -> Token {
    let inner = expr_token(operand);
    match op {
        UnaryOperator::Not => Token::Filter(FilterToken::Not(Box::new(inner))),
        // Signed constants such as `-1` are still constants.
        UnaryOperator::Minus | UnaryOperator::Plus if inner == Token::Literal => Token::Literal,
        _ => Token::Expression {
            operator: op.to_string(),
            operands: vec![inner],
        },
    }
}

fn like_token(operand: &Expr, pattern: &Expr, negated: bool, case_insensitive: bool) -> Token {
    Token::Filter(FilterToken::Like {
        operand: Box::new(expr_token(operand)),
        pattern: Box::new(expr_token(pattern)),
        negated,
        case_insensitive,
    })
}

/// Map a function call to a [`Token::Function`] with argument shapes.
pub fn function_token(function: &Function) -> Token {
    let name = normalize_qualified_name(&function.name.to_string()).to_ascii_lowercase();
    let arguments = match &function.args {
        FunctionArguments::None => Vec::new(),
        FunctionArguments::Subquery(query) => {
            vec![Token::Subquery(Box::new(query.shape_or_verbatim()))]
        }
        FunctionArguments::List(list) => list.args.iter().map(function_arg_token).collect(),
    };
    Token::Function { name, arguments }
}

fn function_arg_token(arg: &FunctionArg) -> Token {
    if let Some(expr) = function_arg_expr(arg) {
        return expr_token(expr);
    }
    match arg {
        FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => Token::Wildcard,
        _ => Token::Unrecognized(arg.to_string()),
    }
}

/// Extract the expression payload from a SQL function argument.
pub fn function_arg_expr(arg: &FunctionArg) -> Option<&Expr> {
    match arg {
        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
        | FunctionArg::Named {
            arg: FunctionArgExpr::Expr(expr),
            ..
        }
        | FunctionArg::ExprNamed {
            arg: FunctionArgExpr::Expr(expr),
            ..
        } => Some(expr),
        _ => None,
    }
}

/// Shapes of a list of expressions, as a set.
pub fn expr_set(exprs: &[Expr]) -> BTreeSet<Token> {
    exprs.iter().map(expr_token).collect()
}
