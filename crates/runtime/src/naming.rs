//! Physical table identity: `<prefix>__<owner>__<name>`.
//!
//! Owners never contain `__` or end in `_`, so the first `__` after the
//! prefix always separates owner from name.

const SEPARATOR: &str = "__";

#[derive(Debug, Clone)]
pub struct SubsetNaming {
    prefix: String,
}

impl SubsetNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn table_id(&self, owner: &str, name: &str) -> String {
        format!("{}{SEPARATOR}{}{SEPARATOR}{}", self.prefix, owner, name)
    }

    /// Splits a table id back into `(owner, name)`; `None` for tables that do
    /// not follow the convention.
    pub fn parse<'a>(&self, table_id: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = table_id
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(SEPARATOR)?;
        let (owner, name) = rest.split_once(SEPARATOR)?;
        if owner.is_empty()
            || owner.ends_with('_')
            || !name.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            return None;
        }
        Some((owner, name))
    }
}
