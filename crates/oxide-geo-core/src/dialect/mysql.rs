//! MySQL geospatial dialect.

use super::DistanceAdapter;
use crate::builder::{ExprBuilder, SqlValue};
use crate::proximity::Coordinate;

/// MySQL / MariaDB spatial functions.
///
/// The origin is passed to `ST_PointFromText` as a bound well-known-text
/// literal, so nothing from the caller is spliced into the SQL text.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlAdapter;

impl DistanceAdapter for MySqlAdapter {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn point_literal(&self, origin: Coordinate) -> ExprBuilder {
        ExprBuilder::with_params(
            "ST_PointFromText(?)",
            vec![SqlValue::Text(origin.to_wkt())],
        )
    }

    fn distance_expression(&self, attribute: &str, origin: Coordinate) -> ExprBuilder {
        let (point, params) = self.point_literal(origin).build();
        ExprBuilder::with_params(format!("ST_Distance({attribute}, {point})"), params)
    }

    fn projects_points_as_text(&self) -> bool {
        true
    }

    fn text_projection(&self, column: &str) -> String {
        format!("ST_AsText({column})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_literal_is_bound() {
        let expr = MySqlAdapter.point_literal(Coordinate::new(10.0, 20.5));
        assert_eq!(expr.sql(), "ST_PointFromText(?)");
        assert_eq!(
            expr.params(),
            &[SqlValue::Text(String::from("POINT(10 20.5)"))]
        );
    }

    #[test]
    fn test_distance_expression() {
        let expr = MySqlAdapter.distance_expression("geom", Coordinate::new(10.0, 20.0));
        assert_eq!(expr.sql(), "ST_Distance(geom, ST_PointFromText(?))");
        assert_eq!(expr.params().len(), 1);
    }

    #[test]
    fn test_text_projection() {
        assert!(MySqlAdapter.projects_points_as_text());
        assert_eq!(MySqlAdapter.text_projection("geom"), "ST_AsText(geom)");
        assert_eq!(MySqlAdapter.placeholder(3), "?");
    }
}
