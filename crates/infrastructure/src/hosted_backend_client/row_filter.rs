/// Sort direction for [`RowFilter::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Row selection rendered as REST query parameters (`col=eq.value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pairs: Vec<(String, String)>,
}

impl RowFilter {
    /// Creates a filter that matches every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned columns, including embedded relations.
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns.to_owned())
    }

    /// Matches rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.push(column, format!("eq.{}", value.to_string()))
    }

    /// Matches rows whose `column` is one of `values`.
    #[must_use]
    pub fn in_list<V: AsRef<str>>(self, column: &str, values: &[V]) -> Self {
        let quoted = values
            .iter()
            .map(|value| format!("\"{}\"", value.as_ref().replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        self.push(column, format!("in.({quoted})"))
    }

    /// Sorts by `column`.
    #[must_use]
    pub fn order(self, column: &str, direction: SortDirection) -> Self {
        self.push("order", format!("{column}.{}", direction.as_str()))
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub fn limit(self, rows: usize) -> Self {
        self.push("limit", rows.to_string())
    }

    /// Names the unique column an upsert resolves collisions on.
    #[must_use]
    pub fn on_conflict(self, column: &str) -> Self {
        self.push("on_conflict", column.to_owned())
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.pairs.push((key.to_owned(), value));
        self
    }
}
