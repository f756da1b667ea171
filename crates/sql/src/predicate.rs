//! Single-expression check for caller-supplied predicates.
//!
//! Every filter is spliced into generated SQL inside parentheses, so it must
//! parse as exactly one boolean expression under the BigQuery dialect with
//! nothing left over: no statement separators, no comments that could swallow
//! the closing parenthesis, and no subqueries reaching outside the target table.

use sqlparser::dialect::BigQueryDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use crate::sql_generator::SqlGenError;

pub fn validate_predicate(predicate: &str) -> Result<(), SqlGenError> {
    let malformed = |reason: String| SqlGenError::MalformedPredicate {
        predicate: predicate.to_string(),
        reason,
    };

    if predicate.trim().is_empty() {
        return Err(malformed("empty predicate".to_string()));
    }

    let dialect = BigQueryDialect {};
    let tokens = Tokenizer::new(&dialect, predicate)
        .tokenize()
        .map_err(|e| malformed(e.to_string()))?;

    for token in &tokens {
        match token {
            Token::SemiColon => {
                return Err(malformed("statement separators are not allowed".to_string()))
            }
            Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => {
                return Err(malformed("comments are not allowed".to_string()))
            }
            Token::Word(w) if w.keyword == Keyword::SELECT => {
                return Err(malformed("subqueries are not allowed".to_string()))
            }
            _ => {}
        }
    }

    let mut parser = Parser::new(&dialect)
        .try_with_sql(predicate)
        .map_err(|e| malformed(e.to_string()))?;
    parser.parse_expr().map_err(|e| malformed(e.to_string()))?;

    let next = parser.peek_token().token;
    if next != Token::EOF {
        return Err(malformed(format!("unexpected trailing input at '{}'", next)));
    }

    Ok(())
}
