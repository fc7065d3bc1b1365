use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_limit() -> u64 {
    10
}

fn default_order_by() -> String {
    "created_at".to_string()
}

fn default_ascending() -> bool {
    true
}

/// Which page of a sorted result set to fetch.
///
/// Deserialises from the pagination wire format, where every key is optional:
///
/// ```ignore
/// let params: PageOptions = serde_json::from_value(json!({"limit": 2}))?;
/// assert_eq!(params.order_by, "created_at");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageOptions {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    /// Opaque position: the `order_by` value of the last item already seen.
    #[serde(default)]
    pub cursor: Option<Value>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            order_by: default_order_by(),
            ascending: default_ascending(),
            cursor: None,
        }
    }
}

impl PageOptions {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order_by = field.into();
        self.ascending = ascending;
        self
    }

    pub fn cursor(mut self, cursor: impl Into<Value>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// A page of results together with the full match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, params: Option<&PageOptions>) -> Self {
        Self {
            total,
            items,
            limit: params.map(|p| p.limit),
            offset: params.map(|p| p.offset),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}
