//! The remote row and blob store.

use crate::error::SyncResult;
use async_trait::async_trait;
use courier_types::Row;
use serde_json::Value;

/// A column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Gte(String, Value),
    Lte(String, Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Row selection shared by reads, updates and deletes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Column list, possibly with embedded relations. `None` selects `*`.
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the single row with the given `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq("id", id.into())
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(column.into(), values));
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.into(), value.into()));
        self
    }

    pub fn lte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Encodes the query as PostgREST URL parameters, in a stable order:
    /// `select`, filters as given, `order`, `limit`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        if let Some(columns) = &self.columns {
            params.push(("select".to_string(), columns.clone()));
        }
        for filter in &self.filters {
            let (column, encoded) = match filter {
                Filter::Eq(c, v) => (c, format!("eq.{}", scalar(v))),
                Filter::Gte(c, v) => (c, format!("gte.{}", scalar(v))),
                Filter::Lte(c, v) => (c, format!("lte.{}", scalar(v))),
                Filter::In(c, vs) => {
                    let list: Vec<String> = vs.iter().map(scalar).collect();
                    (c, format!("in.({})", list.join(",")))
                }
            };
            params.push((column.clone(), encoded));
        }
        if let Some((column, direction)) = &self.order {
            params.push(("order".to_string(), format!("{column}.{}", direction.as_str())));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// The backend the sync engine writes through.
///
/// Mutating calls return the affected rows as the store echoes them back.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> SyncResult<Vec<Row>>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> SyncResult<Vec<Row>>;

    async fn update(&self, table: &str, query: &Query, patch: Row) -> SyncResult<Vec<Row>>;

    async fn delete(&self, table: &str, query: &Query) -> SyncResult<()>;

    /// Stores `bytes` at `bucket/path`.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<()>;

    /// Publicly readable URL for an uploaded object.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
