use serde::Deserialize;
use std::fmt;

/// Path marker for PPL execution.
pub const PPL_PATH: &str = "/_plugins/_ppl";
/// Path marker for SQL execution.
pub const SQL_PATH: &str = "/_plugins/_sql";
/// Path marker for explain requests of either language.
pub const EXPLAIN_PATH: &str = "/_explain";

const EXPLAIN_KEYWORD: &str = "explain";

/// Query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ppl,
    Sql,
}

impl Language {
    /// `Ppl` when `is_ppl`, otherwise `Sql`.
    pub fn from_ppl_flag(is_ppl: bool) -> Self {
        if is_ppl {
            Language::Ppl
        } else {
            Language::Sql
        }
    }

    /// REST path of the language plugin.
    pub fn plugin_path(&self) -> &'static str {
        match self {
            Language::Ppl => PPL_PATH,
            Language::Sql => SQL_PATH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Ppl => write!(f, "PPL"),
            Language::Sql => write!(f, "SQL"),
        }
    }
}

/// One query as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
    pub language: Language,
    pub is_explain: bool,
    pub output_format: String,
}

impl QueryRequest {
    /// Execute `text` in `language`, rendered as json.
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
            is_explain: false,
            output_format: "json".to_string(),
        }
    }

    /// Force the explain entry point.
    pub fn with_explain(mut self, is_explain: bool) -> Self {
        self.is_explain = is_explain;
        self
    }

    /// Set the output format token.
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Decide between explain and execute.
    pub fn route(&self) -> Route<'_> {
        if let Some(rest) = strip_explain_keyword(&self.text) {
            return Route {
                explain: true,
                text: rest,
                path: EXPLAIN_PATH,
            };
        }

        Route {
            explain: self.is_explain,
            text: &self.text,
            path: if self.is_explain {
                EXPLAIN_PATH
            } else {
                self.language.plugin_path()
            },
        }
    }
}

/// Where a request goes and with which text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub explain: bool,
    pub text: &'a str,
    pub path: &'static str,
}

/// Remove a leading `explain` token, ignoring case.
///
/// Returns `None` when the first token is something else, `explainer` included.
fn strip_explain_keyword(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let head = trimmed.get(..EXPLAIN_KEYWORD.len())?;
    if !head.eq_ignore_ascii_case(EXPLAIN_KEYWORD) {
        return None;
    }

    let rest = &trimmed[EXPLAIN_KEYWORD.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("source=logs | head 5", false, false, "source=logs | head 5", PPL_PATH; "plain execute")]
    #[test_case("EXPLAIN source=logs", false, true, "source=logs", EXPLAIN_PATH; "upper keyword")]
    #[test_case("  explain\n  source=logs", false, true, "source=logs", EXPLAIN_PATH; "leading whitespace")]
    #[test_case("source=logs", true, true, "source=logs", EXPLAIN_PATH; "explain flag")]
    #[test_case("explainer=1", false, false, "explainer=1", PPL_PATH; "keyword prefix only")]
    #[test_case("explain", false, true, "", EXPLAIN_PATH; "keyword only")]
    fn test_route(text: &str, flag: bool, explain: bool, expected_text: &str, path: &str) {
        let req = QueryRequest::new(text, Language::Ppl).with_explain(flag);
        let route = req.route();
        assert_eq!(route.explain, explain);
        assert_eq!(route.text, expected_text);
        assert_eq!(route.path, path);
    }

    #[test]
    fn test_sql_path() {
        let req = QueryRequest::new("SELECT * FROM logs", Language::from_ppl_flag(false));
        assert_eq!(req.route().path, SQL_PATH);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let req = QueryRequest::new("é", Language::Sql);
        assert!(!req.route().explain);
    }
}
