//! # oxide-geo-core
//!
//! Proximity ("nearest neighbor") search over point columns for MySQL and
//! PostgreSQL, on top of a small mutable query representation.
//!
//! This crate provides:
//! - A [`QueryCompiler`] that wraps a query into a distance-filtered,
//!   distance-ordered derived table
//! - Dialect adapters for the MySQL spatial functions and the PostgreSQL
//!   `point` type
//! - A projection rewriter that always returns MySQL point columns as
//!   well-known text
//! - A scalar mode for `COUNT(*)` and other aggregates
//!
//! ## Proximity search
//!
//! ```rust
//! use std::sync::Arc;
//! use oxide_geo_core::{DistanceUnit, Query, QueryCompiler, TableSchema};
//!
//! let schema = TableSchema::new("places")
//!     .column("id", "int")
//!     .column("geom", "point");
//!
//! let mut compiler = QueryCompiler::new(Query::new().from("places"), Arc::new(schema), "pgsql");
//! compiler.nearest("52.52,13.40", "geom", 5.0, DistanceUnit::Kilometer)?;
//!
//! let compiled = compiler.finalize()?;
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT distance.* FROM (SELECT *, (111.045 * (geom <-> point($1, $2))) AS _distance \
//!      FROM places) distance WHERE _distance < $3 ORDER BY _distance ASC"
//! );
//! assert_eq!(compiled.params.len(), 3);
//! # Ok::<(), oxide_geo_core::GeoError>(())
//! ```
//!
//! ## Point projection
//!
//! On MySQL, point columns are re-projected with `ST_AsText` when the query
//! is finalized, whether they were selected through a wildcard, explicitly,
//! or implicitly through an empty select list.

pub mod builder;
pub mod compiler;
pub mod dialect;
mod error;
pub mod projection;
pub mod proximity;
pub mod schema;

pub use builder::{col, ExprBuilder, Query, SelectItem, SqlValue};
pub use compiler::{CompiledQuery, CompilerConfig, QueryCompiler, ScalarScope};
pub use dialect::{Connection, Dialect, DistanceAdapter};
pub use error::{GeoError, Result};
pub use projection::{ProjectionMode, ProjectionStyle};
pub use proximity::{
    Coordinate, DistanceUnit, OriginPolicy, ProximityRequest, DEFAULT_RADIUS, DISTANCE_COLUMN,
};
pub use schema::{ColumnSchema, SchemaCatalog, TableSchema};
