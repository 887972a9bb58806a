//! Proximity search: distance subquery shape, parameters, units, and the
//! guarantees around malformed input and unsupported dialects.

mod common;
use common::*;

use oxide_geo_core::builder::{FromSource, OrderDirection};
use oxide_geo_core::{
    CompilerConfig, Coordinate, DistanceUnit, GeoError, OriginPolicy, ProximityRequest, Query,
    SelectItem, SqlValue, DEFAULT_RADIUS,
};

// ===================================================================
// Dialects
// ===================================================================

#[test]
fn mysql_distance_subquery() {
    let mut c = compiler_for(Query::new().select(&["id", "name"]).from("places"), "mysql");
    c.nearest("10.0,20.0", "geom", 50.0, DistanceUnit::Kilometer)
        .unwrap();

    let (sql, params) = c.query().build();
    assert_eq!(
        sql,
        "SELECT distance.* FROM (SELECT id, name, (111.045 * ST_Distance(geom, ST_PointFromText(?))) AS _distance FROM places) distance WHERE _distance < ? ORDER BY _distance ASC"
    );
    assert_eq!(
        params,
        vec![
            SqlValue::Text(String::from("POINT(10 20)")),
            SqlValue::Float(50.0)
        ]
    );
}

#[test]
fn postgres_distance_subquery_binds_lat_lng() {
    let mut c = compiler_for(Query::new().select(&["id"]).from("places"), "pgsql");
    c.nearest("10.0,20.0", "geom", 50.0, DistanceUnit::Kilometer)
        .unwrap();

    let compiled = c.finalize().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT distance.* FROM (SELECT id, (111.045 * (geom <-> point($1, $2))) AS _distance FROM places) distance WHERE _distance < $3 ORDER BY _distance ASC"
    );
    assert_eq!(
        compiled.params,
        vec![
            SqlValue::Float(10.0),
            SqlValue::Float(20.0),
            SqlValue::Float(50.0)
        ]
    );
}

#[test]
fn mile_unit_uses_69() {
    let mut c = compiler_for(Query::new().select(&["id"]).from("places"), "mysql");
    c.nearest("10.0,20.0", "geom", 50.0, DistanceUnit::Mile)
        .unwrap();

    let (sql, _) = c.query().build();
    assert!(sql.contains("(69.0 * ST_Distance(geom, ST_PointFromText(?))) AS _distance"));
    assert!(sql.ends_with("WHERE _distance < ? ORDER BY _distance ASC"));
}

#[test]
fn outer_query_filters_and_orders_on_distance() {
    let mut c = compiler("mysql");
    c.nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer).unwrap();

    let query = c.query();
    assert_eq!(query.select_items(), &[SelectItem::column("distance.*")]);
    assert!(matches!(
        query.from_sources(),
        [FromSource::Subquery { alias, .. }] if alias == "distance"
    ));
    let filter = query.where_expr().unwrap();
    assert_eq!(filter.sql(), "_distance < ?");
    assert_eq!(filter.params(), &[SqlValue::Float(5.0)]);
    assert_eq!(query.orderings().len(), 1);
    assert_eq!(query.orderings()[0].column, "_distance");
    assert_eq!(query.orderings()[0].direction, OrderDirection::Asc);
}

#[test]
fn empty_select_keeps_all_columns_in_subquery() {
    let mut c = compiler("mysql");
    c.nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer).unwrap();

    let (inner, _) = c.query().derived_source().unwrap();
    assert_eq!(inner.select_items()[0], SelectItem::column("*"));
    assert!(matches!(
        &inner.select_items()[1],
        SelectItem::Expr { alias: Some(alias), .. } if alias == "_distance"
    ));
}

// ===================================================================
// Clause clearing
// ===================================================================

#[test]
fn incompatible_clauses_are_cleared() {
    let query = Query::new()
        .select(&["id"])
        .distinct()
        .from("places p")
        .join("owners o", "o.id = p.owner_id")
        .group_by(&["id"])
        .order_by("-id")
        .limit(10)
        .offset(5)
        .union(Query::new().select(&["id"]).from("archived"));
    let mut c = compiler_for(query, "mysql");
    c.nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer).unwrap();

    let query = c.query();
    assert_eq!(query.limit_value(), None);
    assert_eq!(query.offset_value(), None);
    assert!(!query.is_distinct());
    assert!(query.group_by_columns().is_empty());
    assert!(query.joins().is_empty());
    assert!(query.unions().is_empty());
}

#[test]
fn limit_and_distinct_cleared() {
    let mut c = compiler_for(Query::new().from("places").limit(10).distinct(), "pgsql");
    c.nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer).unwrap();

    assert_eq!(c.query().limit_value(), None);
    assert!(!c.query().is_distinct());
}

// ===================================================================
// Malformed origin
// ===================================================================

#[test]
fn malformed_origin_is_a_no_op_by_default() {
    let mut c = compiler_for(
        Query::new().select(&["id"]).from("places").order_by("name").limit(3),
        "mysql",
    );
    let before = c.query().clone();

    c.nearest("not-a-point", "geom", 50.0, DistanceUnit::Kilometer)
        .unwrap();

    assert_eq!(c.query(), &before);
}

#[test]
fn malformed_origin_rejected_when_configured() {
    let config = CompilerConfig {
        origin_policy: OriginPolicy::Reject,
        ..CompilerConfig::default()
    };
    let mut c = compiler("mysql").with_config(config);
    let before = c.query().clone();

    let err = c
        .nearest("10.0", "geom", 50.0, DistanceUnit::Kilometer)
        .unwrap_err();

    assert!(matches!(err, GeoError::MalformedOrigin { ref input } if input == "10.0"));
    assert_eq!(c.query(), &before);
}

// ===================================================================
// Failures before mutation
// ===================================================================

#[test]
fn unsupported_dialect_leaves_query_untouched() {
    let mut c = compiler_for(Query::new().select(&["id"]).from("places").order_by("id"), "sqlite");
    let before = c.query().clone();

    let err = c
        .nearest("10.0,20.0", "geom", 50.0, DistanceUnit::Kilometer)
        .unwrap_err();

    assert!(matches!(err, GeoError::UnsupportedDialect { ref driver } if driver == "sqlite"));
    assert_eq!(c.query(), &before);
}

#[test]
fn unsupported_dialect_also_fails_finalize() {
    let c = compiler("sqlite");
    assert!(matches!(
        c.finalize(),
        Err(GeoError::UnsupportedDialect { .. })
    ));
}

#[test]
fn invalid_attribute_leaves_query_untouched() {
    let mut c = compiler("mysql");
    let before = c.query().clone();

    let err = c
        .nearest("1,2", "geom, (SELECT 1)", 5.0, DistanceUnit::Kilometer)
        .unwrap_err();

    assert!(matches!(err, GeoError::InvalidAttribute(_)));
    assert_eq!(c.query(), &before);
}

// ===================================================================
// Typed requests
// ===================================================================

#[test]
fn request_defaults() {
    let request = ProximityRequest::new(Coordinate::new(1.0, 2.0), "geom");
    assert!((request.radius - DEFAULT_RADIUS).abs() < f64::EPSILON);
    assert_eq!(request.unit, DistanceUnit::Kilometer);
}

#[test]
fn nearest_request_matches_string_form() {
    let mut from_string = compiler("mysql");
    from_string
        .nearest("1.5,2.5", "geom", 100.0, DistanceUnit::Mile)
        .unwrap();

    let mut from_request = compiler("mysql");
    from_request
        .nearest_request(
            &ProximityRequest::new(Coordinate::new(1.5, 2.5), "geom").unit(DistanceUnit::Mile),
        )
        .unwrap();

    assert_eq!(from_string.query(), from_request.query());
}

#[test]
fn chaining_returns_the_compiler() {
    let mut c = compiler("mysql");
    let compiled = c
        .nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer)
        .unwrap()
        .finalize()
        .unwrap();
    assert!(compiled.sql.starts_with("SELECT distance.* FROM ("));
}

// ===================================================================
// Primary table and joins
// ===================================================================

#[test]
fn missing_from_reads_the_primary_table() {
    let mut c = compiler_for(Query::new(), "pgsql");
    c.nearest("1,2", "geom", 5.0, DistanceUnit::Kilometer).unwrap();

    assert_eq!(
        c.finalize().unwrap().sql,
        "SELECT distance.* FROM (SELECT *, (111.045 * (geom <-> point($1, $2))) AS _distance FROM places) distance WHERE _distance < $3 ORDER BY _distance ASC"
    );
}

#[test]
fn joined_columns_survive_on_both_dialects() {
    let joined = || {
        Query::new()
            .from("places p")
            .join("owners o", "o.id = p.owner_id")
    };

    let mut mysql = compiler_for(joined(), "mysql");
    mysql
        .nearest("1,2", "p.geom", 5.0, DistanceUnit::Kilometer)
        .unwrap();
    assert_eq!(
        mysql.finalize().unwrap().sql,
        "SELECT distance.* FROM (SELECT p.id, p.name, ST_AsText(p.geom) AS geom, ST_AsText(p.location) AS location, o.*, (111.045 * ST_Distance(p.geom, ST_PointFromText(?))) AS _distance FROM places p INNER JOIN owners o ON o.id = p.owner_id) distance WHERE _distance < ? ORDER BY _distance ASC"
    );

    let mut pgsql = compiler_for(joined(), "pgsql");
    pgsql
        .nearest("1,2", "p.geom", 5.0, DistanceUnit::Kilometer)
        .unwrap();
    assert_eq!(
        pgsql.finalize().unwrap().sql,
        "SELECT distance.* FROM (SELECT *, (111.045 * (p.geom <-> point($1, $2))) AS _distance FROM places p INNER JOIN owners o ON o.id = p.owner_id) distance WHERE _distance < $3 ORDER BY _distance ASC"
    );
}
