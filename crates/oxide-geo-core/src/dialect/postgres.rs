//! PostgreSQL geometric dialect.

use super::DistanceAdapter;
use crate::builder::{ExprBuilder, SqlValue};
use crate::proximity::Coordinate;

/// PostgreSQL native `point` type and the `<->` distance operator.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresAdapter;

impl DistanceAdapter for PostgresAdapter {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn point_literal(&self, origin: Coordinate) -> ExprBuilder {
        ExprBuilder::with_params(
            "point(?, ?)",
            vec![SqlValue::Float(origin.lat), SqlValue::Float(origin.lng)],
        )
    }

    fn distance_expression(&self, attribute: &str, origin: Coordinate) -> ExprBuilder {
        let (point, params) = self.point_literal(origin).build();
        ExprBuilder::with_params(format!("({attribute} <-> {point})"), params)
    }

    // Points are already returned as "(x,y)" text.
    fn projects_points_as_text(&self) -> bool {
        false
    }

    fn text_projection(&self, column: &str) -> String {
        column.to_string()
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }
}
