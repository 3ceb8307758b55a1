use searchgate_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One column of a result schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            r#type: r#type.into(),
        }
    }

    /// Header label: the alias if there is one.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Tabular result of an executed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub schema: Vec<Column>,
    #[serde(default)]
    pub datarows: Vec<Vec<Value>>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub size: u64,
}

impl QueryResult {
    /// Build a result whose total and size match the rows.
    pub fn new(schema: Vec<Column>, datarows: Vec<Vec<Value>>) -> Self {
        let n = datarows.len() as u64;
        Self {
            schema,
            datarows,
            total: n,
            size: n,
        }
    }

    /// Keep at most `limit` rows. `total` still reports what the engine had.
    pub fn truncate(&mut self, limit: usize) {
        self.datarows.truncate(limit);
        self.size = self.datarows.len() as u64;
    }
}

/// What one query produced. Exactly one per request.
#[derive(Debug)]
pub enum QueryOutcome {
    Success(QueryResult),
    ExplainPlan(Value),
    Failure(Error),
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryOutcome::Failure(_))
    }
}
