//! SQL parser wrapper around sqlparser-rs

use crate::error::{TranslateError, TranslateResult};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Parse SQL text into AST statements
pub fn parse(sql: &str) -> TranslateResult<Vec<Statement>> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(TranslateError::Parse("empty SQL".to_string()));
    }
    Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| TranslateError::Parse(e.to_string()))
}

/// Parse SQL expected to hold exactly one statement
pub fn parse_single(sql: &str) -> TranslateResult<Statement> {
    let mut statements = parse(sql)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(TranslateError::Unsupported(format!(
            "multi-statement input ({n} statements)"
        ))),
    }
}
