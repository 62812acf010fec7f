//! Logical SQL expansion.
//!
//! Library SQL refers to tables as `::name` and binds parameters with `?`.
//! Before execution every `::name` becomes the quoted, prefixed table and
//! every `?` the dialect's placeholder. Quoted literals and identifiers are
//! copied through untouched.

use crate::dialect::Dialect;

/// SQL ready for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSql {
    pub sql: String,
    /// The first logical table referenced, used to label errors.
    pub table: Option<String>,
}

/// Expand `::name` table references and `?` placeholders.
pub fn expand(sql: &str, prefix: &str, dialect: &dyn Dialect) -> ExpandedSql {
    let mut out = String::with_capacity(sql.len() + 32);
    let mut table = None;
    let mut param = 0usize;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                for (_, d) in chars.by_ref() {
                    out.push(d);
                    if d == c {
                        break;
                    }
                }
            }
            '?' => {
                param += 1;
                out.push_str(&dialect.param_placeholder(param));
            }
            ':' if sql[i..].starts_with("::") => {
                let rest = &sql[i + 2..];
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len());
                if len == 0 {
                    out.push(c);
                    continue;
                }
                let name = &rest[..len];
                out.push_str(&dialect.quote_ident(&format!("{}{}", prefix, name)));
                if table.is_none() {
                    table = Some(name.to_string());
                }
                // consume the second ':' and the name
                for _ in 0..len + 1 {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    ExpandedSql { sql: out, table }
}
