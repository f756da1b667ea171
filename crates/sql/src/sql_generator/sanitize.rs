use super::error::SqlGenError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_IDENTIFIER_LEN: usize = 64;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

static FIELD_CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_,\s*]+$").unwrap());

static FIELD_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\*|[A-Za-z_][A-Za-z0-9_]*)$").unwrap());

/// Subset names and owners: a letter followed by letters, digits or underscores.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), SqlGenError> {
    let invalid = |reason: String| SqlGenError::InvalidIdentifier {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(format!(
            "too long: {} > {}",
            value.len(),
            MAX_IDENTIFIER_LEN
        )));
    }
    if !IDENTIFIER_REGEX.is_match(value) {
        return Err(invalid("forbidden characters".to_string()));
    }
    Ok(())
}

/// Owners are embedded between `__` separators in table names, so they may
/// not contain `__` or end with `_`.
pub fn validate_owner(value: &str) -> Result<(), SqlGenError> {
    validate_identifier("owner", value)?;
    if value.contains("__") || value.ends_with('_') {
        return Err(SqlGenError::InvalidIdentifier {
            field: "owner",
            value: value.to_string(),
            reason: "must not contain '__' or end with '_'".to_string(),
        });
    }
    Ok(())
}

/// Parses a comma-separated projection. Absent or blank input selects `*`.
pub fn parse_field_list(raw: Option<&str>) -> Result<Vec<String>, SqlGenError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(vec!["*".to_string()]),
        Some(raw) => raw,
    };

    let invalid = |reason: &str| SqlGenError::InvalidFieldList {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if !FIELD_CHARSET_REGEX.is_match(raw) {
        return Err(invalid(
            "only letters, digits, underscores, commas, whitespace and * are allowed",
        ));
    }

    let fields: Vec<String> = raw.split(',').map(|f| f.trim().to_string()).collect();
    if fields.iter().any(|f| f.is_empty()) {
        return Err(invalid("empty item in field list"));
    }
    if let Some(bad) = fields.iter().find(|f| !FIELD_ITEM_REGEX.is_match(f)) {
        return Err(SqlGenError::InvalidFieldList {
            value: raw.to_string(),
            reason: format!("'{}' is not a column name", bad),
        });
    }
    if fields.len() > 1 && fields.iter().any(|f| f == "*") {
        return Err(invalid("* cannot be combined with named fields"));
    }

    Ok(fields)
}

pub fn render_field_list(fields: &[String]) -> String {
    if fields.is_empty() {
        "*".to_string()
    } else {
        fields.join(", ")
    }
}

/// Quotes text as a BigQuery string literal.
pub fn escape_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\x00"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
