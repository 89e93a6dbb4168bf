//! Tagged SQL fragments.
//!
//! Column names and predicate expressions cannot be bound as parameters, so
//! they end up spliced into query text. Instead of interpolating strings at
//! each call site, every splice goes through a [`SqlFragment`] that says what
//! kind of text it is:
//!
//! - [`SqlFragment::Ident`]: a bare column identifier, validated at
//!   construction (alphanumeric + underscore only)
//! - [`SqlFragment::Raw`]: caller-supplied SQL spliced verbatim
//!
//! Plain *values* (recode mapping entries, percentile bounds) never splice as
//! text at all: they bind through the engine's typed literals, the parameter
//! side of this split.
//!
//! `Raw` is the trust boundary: `--where` predicates are SQL by design, and
//! this tool accepts them from its (trusted, single) operator. Anything
//! exposed to untrusted input must not use `Raw`.

use std::fmt;

use crate::error::{Result, TabverError};

/// A piece of SQL text, tagged with how it may be spliced into a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlFragment {
    /// Trusted free-text SQL (e.g. a `--where` predicate). Spliced verbatim.
    Raw(String),
    /// A validated bare identifier.
    Ident(String),
}

impl SqlFragment {
    /// Tag caller-supplied SQL as trusted raw text.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// Validate `name` as a bare identifier and tag it.
    pub fn ident(name: &str) -> Result<Self> {
        validate_identifier(name)?;
        Ok(Self::Ident(name.to_string()))
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(sql) => f.write_str(sql),
            Self::Ident(name) => f.write_str(name),
        }
    }
}

/// Minimal identifier check: non-empty, ASCII alphanumeric or underscore.
///
/// Columns with other characters would need quoting support; rejecting them
/// keeps identifier splices unambiguous.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(TabverError::invalid("column name is empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TabverError::invalid(format!(
            "invalid column name '{name}' (expected alphanumeric/underscore)"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::{validate_identifier, SqlFragment};

    #[test]
    fn ident_accepts_snake_case_and_rejects_injection() {
        assert!(SqlFragment::ident("income_2023").is_ok());
        assert!(SqlFragment::ident("x1").is_ok());
        assert!(SqlFragment::ident("").is_err());
        assert!(SqlFragment::ident("income; DROP TABLE t").is_err());
        assert!(SqlFragment::ident("a b").is_err());
    }

    #[test]
    fn raw_renders_verbatim() {
        let raw = SqlFragment::raw("income > 1000 AND region = 'N'");
        assert_eq!(raw.to_string(), "income > 1000 AND region = 'N'");
    }

    #[test]
    fn validate_identifier_returns_input() {
        assert_eq!(validate_identifier("abc").unwrap(), "abc");
    }
}
