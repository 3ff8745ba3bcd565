use super::QueryError;
use crate::datamodel::METRIC_NAME_LABEL;
use crate::parsing::prometheus::models::{LabelMatcher, label_matcher::Type};

/// Builds InfluxQL `SELECT` statements from remote read matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTranslator {
    retention_policy: String,
}

impl QueryTranslator {
    pub fn new(retention_policy: impl Into<String>) -> Self {
        Self {
            retention_policy: retention_policy.into(),
        }
    }

    /// Translates one remote read query.
    ///
    /// The `__name__` matcher selects the measurement; without one, every
    /// measurement is queried. All other matchers filter on tags.
    pub fn translate(
        &self,
        matchers: &[LabelMatcher],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<String, QueryError> {
        let mut from = "/.+/".to_string();
        let mut conditions = Vec::with_capacity(matchers.len() + 2);

        for matcher in matchers {
            if matcher.name == METRIC_NAME_LABEL {
                from = match Type::try_from(matcher.r#type) {
                    Ok(Type::Eq) => self.qualify(&quote_ident(&matcher.value)),
                    Ok(Type::Re) => {
                        self.qualify(&format!("/^{}$/", escape_slashes(&matcher.value)))
                    }
                    Ok(Type::Neq) => return Err(QueryError::UnsupportedMatcher("Not-equal")),
                    Ok(Type::Nre) => return Err(QueryError::UnsupportedMatcher("Negated regex")),
                    Err(_) => return Err(QueryError::UnsupportedMatcher("Unknown")),
                };
                continue;
            }

            let matcher_type = Type::try_from(matcher.r#type)
                .map_err(|_| QueryError::UnknownMatcherType(matcher.r#type))?;
            let name = quote_ident(&matcher.name);
            conditions.push(match matcher_type {
                Type::Eq => format!("{} = '{}'", name, escape_single_quotes(&matcher.value)),
                Type::Neq => format!("{} != '{}'", name, escape_single_quotes(&matcher.value)),
                Type::Re => format!("{} =~ /^{}$/", name, escape_slashes(&matcher.value)),
                Type::Nre => format!("{} !~ /^{}$/", name, escape_slashes(&matcher.value)),
            });
        }

        conditions.push(format!("time >= {}ms", start_ms));
        conditions.push(format!("time <= {}ms", end_ms));

        Ok(format!(
            "SELECT value FROM {} WHERE {} GROUP BY *",
            from,
            conditions.join(" AND ")
        ))
    }

    /// Prefixes a measurement clause with the retention policy, when one is set.
    fn qualify(&self, measurement: &str) -> String {
        if self.retention_policy.is_empty() {
            measurement.to_string()
        } else {
            format!("{}.{}", quote_ident(&self.retention_policy), measurement)
        }
    }
}

/// Double quotes an identifier, escaping backslashes and double quotes.
pub fn quote_ident(ident: &str) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push('"');
    for c in ident.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "\\'")
}

pub fn escape_slashes(value: &str) -> String {
    value.replace('/', "\\/")
}
