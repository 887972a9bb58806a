//! Nearest-neighbor subquery compilation.
//!
//! A proximity search wraps the caller's query into a derived table that
//! carries one extra computed column, `_distance`, and then filters and
//! orders the outer query on it:
//!
//! ```text
//! SELECT distance.* FROM (
//!     SELECT ..., (111.045 * ST_Distance(geom, ST_PointFromText(?))) AS _distance
//!     FROM places
//! ) distance
//! WHERE _distance < ? ORDER BY _distance ASC
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{col, OrderBy, Query, SelectItem};
use crate::dialect::DistanceAdapter;
use crate::error::{GeoError, Result};

/// Name of the computed distance column.
pub const DISTANCE_COLUMN: &str = "_distance";

/// Alias of the derived table holding the distance column.
pub const DISTANCE_ALIAS: &str = "distance";

/// Radius used when the caller does not pick one.
pub const DEFAULT_RADIUS: f64 = 100.0;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap()
});

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the well-known-text form, `POINT(lat lng)`.
    #[must_use]
    pub fn to_wkt(self) -> String {
        format!("POINT({} {})", self.lat, self.lng)
    }
}

impl FromStr for Coordinate {
    type Err = GeoError;

    /// Parses `"lat,lng"`. Exactly two finite numbers are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || GeoError::MalformedOrigin {
            input: s.to_string(),
        };
        let mut parts = s.split(',').map(str::trim);
        let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let lat: f64 = lat.parse().map_err(|_| malformed())?;
        let lng: f64 = lng.parse().map_err(|_| malformed())?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(malformed());
        }
        Ok(Self { lat, lng })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Unit of the radius and of the computed distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Kilometers.
    #[default]
    #[serde(alias = "km")]
    Kilometer,
    /// Statute miles.
    #[serde(alias = "mil")]
    Mile,
}

impl DistanceUnit {
    /// Approximate length of one degree of latitude in this unit.
    #[must_use]
    pub const fn length_per_degree(self) -> f64 {
        match self {
            Self::Kilometer => 111.045,
            Self::Mile => 69.0,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "km" | "kilometer" | "kilometers" => Ok(Self::Kilometer),
            "mil" | "mi" | "mile" | "miles" => Ok(Self::Mile),
            _ => Err(GeoError::UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kilometer => f.write_str("km"),
            Self::Mile => f.write_str("mil"),
        }
    }
}

/// What to do with an origin that is not a `lat,lng` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginPolicy {
    /// Leave the query untouched.
    #[default]
    Ignore,
    /// Fail with [`GeoError::MalformedOrigin`].
    Reject,
}

/// A fully parsed proximity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityRequest {
    /// Search center.
    pub origin: Coordinate,
    /// Point column the distance is measured from.
    pub attribute: String,
    /// Maximum distance, in `unit`.
    pub radius: f64,
    /// Unit of `radius` and of `_distance`.
    pub unit: DistanceUnit,
}

impl ProximityRequest {
    /// Creates a request with the default radius and unit.
    #[must_use]
    pub fn new(origin: Coordinate, attribute: &str) -> Self {
        Self {
            origin,
            attribute: attribute.to_string(),
            radius: DEFAULT_RADIUS,
            unit: DistanceUnit::default(),
        }
    }

    /// Sets the radius.
    #[must_use]
    pub const fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the unit.
    #[must_use]
    pub const fn unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }
}

/// Checks that `attribute` is a plain or table-qualified identifier.
pub fn validate_attribute(attribute: &str) -> Result<()> {
    if IDENTIFIER.is_match(attribute) {
        Ok(())
    } else {
        Err(GeoError::InvalidAttribute(attribute.to_string()))
    }
}

/// Rewrites `query` in place into the distance-filtered form.
///
/// The caller resolves the adapter and validates the attribute first; this
/// function cannot fail, so a query is never left half-rewritten.
pub(crate) fn wrap_in_distance_subquery(
    query: &mut Query,
    request: &ProximityRequest,
    adapter: &dyn DistanceAdapter,
) {
    let distance = adapter
        .distance_expression(&request.attribute, request.origin)
        .scaled(request.unit.length_per_degree());

    let mut inner = std::mem::take(query);
    if inner.select.is_empty() {
        inner.select.push(SelectItem::column("*"));
    }
    inner.select.push(SelectItem::expr(distance, DISTANCE_COLUMN));

    query.select = vec![SelectItem::column(&format!("{DISTANCE_ALIAS}.*"))];
    query.set_from_subquery(inner, DISTANCE_ALIAS);
    query.where_clause = Some(col(DISTANCE_COLUMN).lt(request.radius));
    query.order_by = vec![OrderBy::asc(DISTANCE_COLUMN)];

    query.limit = None;
    query.offset = None;
    query.distinct = false;
    query.group_by.clear();
    query.joins.clear();
    query.unions.clear();

    debug!(
        dialect = adapter.name(),
        attribute = %request.attribute,
        origin = %request.origin,
        radius = request.radius,
        unit = %request.unit,
        "wrapped query in distance subquery"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlValue;
    use crate::dialect::{MySqlAdapter, PostgresAdapter};

    #[test]
    fn test_coordinate_parsing() {
        assert_eq!(
            "10.0,20.0".parse::<Coordinate>().unwrap(),
            Coordinate::new(10.0, 20.0)
        );
        assert_eq!(
            " -33.86 , 151.2 ".parse::<Coordinate>().unwrap(),
            Coordinate::new(-33.86, 151.2)
        );
    }

    #[test]
    fn test_coordinate_rejects_malformed() {
        for input in ["not-a-point", "10.0", "10,20,30", "a,b", "10,", "NaN,1", "inf,2"] {
            assert!(
                matches!(
                    input.parse::<Coordinate>(),
                    Err(GeoError::MalformedOrigin { .. })
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_wkt() {
        assert_eq!(Coordinate::new(10.0, 20.5).to_wkt(), "POINT(10 20.5)");
    }

    #[test]
    fn test_units() {
        assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometer);
        assert_eq!("mil".parse::<DistanceUnit>().unwrap(), DistanceUnit::Mile);
        assert_eq!("Miles".parse::<DistanceUnit>().unwrap(), DistanceUnit::Mile);
        assert!(matches!(
            "furlong".parse::<DistanceUnit>(),
            Err(GeoError::UnknownUnit(_))
        ));
        assert!((DistanceUnit::Kilometer.length_per_degree() - 111.045).abs() < f64::EPSILON);
        assert!((DistanceUnit::Mile.length_per_degree() - 69.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_attribute_validation() {
        assert!(validate_attribute("geom").is_ok());
        assert!(validate_attribute("p.geom").is_ok());
        assert!(validate_attribute("geom) OR 1=1 --").is_err());
        assert!(validate_attribute("").is_err());
    }

    #[test]
    fn test_wrap_keeps_original_columns_and_clears_outer() {
        let mut query = Query::new().from("places").limit(5).distinct();
        let request = ProximityRequest::new(Coordinate::new(1.0, 2.0), "geom").radius(7.5);

        wrap_in_distance_subquery(&mut query, &request, &MySqlAdapter);

        let (inner, alias) = query.derived_source().unwrap();
        assert_eq!(alias, DISTANCE_ALIAS);
        assert_eq!(inner.select_items()[0], SelectItem::column("*"));
        assert_eq!(inner.limit_value(), Some(5));
        assert_eq!(query.limit_value(), None);
        assert!(!query.is_distinct());
        assert_eq!(query.where_expr().unwrap().params(), &[SqlValue::Float(7.5)]);
    }

    #[test]
    fn test_wrap_postgres_parameter_order() {
        let mut query = Query::new().from("places");
        let request = ProximityRequest::new(Coordinate::new(10.0, 20.0), "geom").radius(50.0);

        wrap_in_distance_subquery(&mut query, &request, &PostgresAdapter);

        let (sql, params) = query.build();
        assert_eq!(
            sql,
            "SELECT distance.* FROM (SELECT *, (111.045 * (geom <-> point(?, ?))) AS _distance FROM places) distance WHERE _distance < ? ORDER BY _distance ASC"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Float(10.0),
                SqlValue::Float(20.0),
                SqlValue::Float(50.0)
            ]
        );
    }
}
