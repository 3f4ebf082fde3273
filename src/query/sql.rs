use crate::core::types::FieldValue;
use crate::query::filter::Filter;
use crate::search::results::RankMap;

/// Parameterised SQL text with `?` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl SqlFragment {
    fn literal(sql: &str) -> Self {
        SqlFragment {
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl Filter {
    /// Render as a `WHERE` clause body.
    ///
    /// `Nothing` becomes the constant `1 = 0`; an empty `IN ()` is never
    /// produced.
    pub fn to_sql(&self) -> SqlFragment {
        match self {
            Filter::All => SqlFragment::literal("1 = 1"),
            Filter::Nothing => SqlFragment::literal("1 = 0"),
            Filter::KeyIn { keys, .. } if keys.is_empty() => SqlFragment::literal("1 = 0"),
            Filter::KeyIn { attribute, keys } => {
                let placeholders = vec!["?"; keys.len()].join(", ");
                SqlFragment {
                    sql: format!("{} IN ({})", quote_identifier(attribute), placeholders),
                    params: keys.iter().cloned().map(FieldValue::Text).collect(),
                }
            }
            Filter::Compare { attribute, op, value } => SqlFragment {
                sql: format!("{} {} ?", quote_identifier(attribute), op.symbol()),
                params: vec![value.clone()],
            },
            Filter::IsNull(attribute) => {
                SqlFragment::literal(&format!("{} IS NULL", quote_identifier(attribute)))
            }
            Filter::And(filters) => join(filters, " AND ", "1 = 1"),
            Filter::Or(filters) => join(filters, " OR ", "1 = 0"),
            Filter::Not(inner) => {
                let inner = inner.to_sql();
                SqlFragment {
                    sql: format!("NOT ({})", inner.sql),
                    params: inner.params,
                }
            }
        }
    }
}

fn join(filters: &[Filter], separator: &str, empty: &str) -> SqlFragment {
    if filters.is_empty() {
        return SqlFragment::literal(empty);
    }
    let mut params = Vec::new();
    let parts: Vec<String> = filters
        .iter()
        .map(|f| {
            let fragment = f.to_sql();
            params.extend(fragment.params);
            format!("({})", fragment.sql)
        })
        .collect();
    SqlFragment {
        sql: parts.join(separator),
        params,
    }
}

/// `ORDER BY` body that sorts rows by relevance rank; `None` for an empty map
pub fn order_by_rank(attribute: &str, ranks: &RankMap) -> Option<SqlFragment> {
    if ranks.is_empty() {
        return None;
    }
    let mut sql = format!("CASE {}", quote_identifier(attribute));
    let mut params = Vec::with_capacity(ranks.len());
    for (rank, key) in ranks.ordered_keys().into_iter().enumerate() {
        sql.push_str(&format!(" WHEN ? THEN {}", rank));
        params.push(FieldValue::Text(key.to_string()));
    }
    sql.push_str(&format!(" ELSE {} END", ranks.len()));
    Some(SqlFragment { sql, params })
}
