//! Parameterized SQL fragments.

use super::value::{SqlValue, ToSqlValue};

/// Creates a column reference, e.g. `col("_distance")` or `col("p.kind")`.
#[must_use]
pub fn col(name: &str) -> Column {
    Column(name.to_string())
}

/// A column reference used on the left side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

impl Column {
    /// The column as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// `column = ?`
    #[must_use]
    pub fn eq<T: ToSqlValue>(self, value: T) -> ExprBuilder {
        self.compare("=", value)
    }

    /// `column < ?`
    #[must_use]
    pub fn lt<T: ToSqlValue>(self, value: T) -> ExprBuilder {
        self.compare("<", value)
    }

    /// `column > ?`
    #[must_use]
    pub fn gt<T: ToSqlValue>(self, value: T) -> ExprBuilder {
        self.compare(">", value)
    }

    fn compare<T: ToSqlValue>(self, op: &str, value: T) -> ExprBuilder {
        ExprBuilder::with_params(format!("{} {op} ?", self.0), vec![value.to_sql_value()])
    }
}

/// A SQL fragment together with the values bound to its `?` placeholders,
/// in order of appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl ExprBuilder {
    /// Creates a fragment without parameters.
    ///
    /// Only for SQL that carries no caller input.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::with_params(sql, Vec::new())
    }

    /// Creates a fragment from SQL text and the values for its
    /// placeholders.
    #[must_use]
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Multiplies the expression by a constant factor: `(factor * expr)`.
    ///
    /// The factor is rendered with at least one decimal digit so that
    /// MySQL evaluates the product as a double.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            sql: format!("({factor:?} * {})", self.sql),
            params: self.params,
        }
    }

    /// Joins two conditions with AND.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.sql = format!("{} AND {}", self.sql, other.sql);
        self.params.extend(other.params);
        self
    }

    /// Wraps the expression in parentheses.
    #[must_use]
    pub fn paren(mut self) -> Self {
        self.sql = format!("({})", self.sql);
        self
    }

    /// Returns the SQL string.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameters.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Consumes the builder and returns the SQL and parameters.
    #[must_use]
    pub fn build(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}
