//! Aggregates evaluated over a compiled query.
//!
//! Every aggregate is cast to a double so it decodes as `f64` on both
//! drivers. The distance helpers read the `_distance` column, which exists
//! once a proximity search has been applied.

use oxide_geo_core::{Dialect, DISTANCE_COLUMN};

/// An aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `COUNT(col)`
    Count,
    /// `COUNT(DISTINCT col)`
    CountDistinct,
    /// `SUM(col)`
    Sum,
    /// `AVG(col)`
    Avg,
    /// `MIN(col)`
    Min,
    /// `MAX(col)`
    Max,
}

/// An aggregate function applied to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    function: AggregateFn,
    column: String,
}

impl Aggregate {
    /// Applies `function` to `column` (`*` is only meaningful for counts).
    #[must_use]
    pub fn new(function: AggregateFn, column: &str) -> Self {
        Self {
            function,
            column: column.to_string(),
        }
    }

    /// Applies `function` to the computed distance of a proximity search,
    /// e.g. the mean distance of the matching rows.
    #[must_use]
    pub fn distance(function: AggregateFn) -> Self {
        Self::new(function, DISTANCE_COLUMN)
    }

    /// The function.
    #[must_use]
    pub const fn function(&self) -> AggregateFn {
        self.function
    }

    /// The column the function reads.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Renders the aggregate cast to the dialect's double type.
    #[must_use]
    pub fn to_float_sql(&self, dialect: Dialect) -> String {
        let column = &self.column;
        let call = match self.function {
            AggregateFn::Count => format!("COUNT({column})"),
            AggregateFn::CountDistinct => format!("COUNT(DISTINCT {column})"),
            AggregateFn::Sum => format!("SUM({column})"),
            AggregateFn::Avg => format!("AVG({column})"),
            AggregateFn::Min => format!("MIN({column})"),
            AggregateFn::Max => format!("MAX({column})"),
        };
        let ty = match dialect {
            Dialect::MySql => "DOUBLE",
            Dialect::Postgres => "DOUBLE PRECISION",
        };
        format!("CAST({call} AS {ty})")
    }
}

/// Count and distance bounds of the rows matched by a proximity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStats {
    /// Matching rows.
    pub count: i64,
    /// Distance of the nearest row; None without matches.
    pub nearest: Option<f64>,
    /// Mean distance.
    pub mean: Option<f64>,
    /// Distance of the farthest row within the radius.
    pub farthest: Option<f64>,
}

impl DistanceStats {
    /// The select expression computing the statistics in one row:
    /// count, min, avg and max of `_distance`.
    #[must_use]
    pub fn select_sql(dialect: Dialect) -> String {
        let bounds: Vec<String> = [AggregateFn::Min, AggregateFn::Avg, AggregateFn::Max]
            .into_iter()
            .map(|function| Aggregate::distance(function).to_float_sql(dialect))
            .collect();
        format!("COUNT(*), {}", bounds.join(", "))
    }
}
