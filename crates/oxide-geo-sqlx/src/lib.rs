//! # oxide-geo-sqlx
//!
//! Runs oxide-geo proximity queries on MySQL and PostgreSQL through sqlx.
//!
//! This crate provides:
//! - [`MySqlExecutor`] and [`PgExecutor`], pool wrappers that act as the
//!   compiler's connection
//! - Row fetching with parameters bound in order
//! - Scalar helpers (`count`, `exists`, `aggregate`, `distance_stats`) that
//!   run with point projection suppressed
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use oxide_geo_core::{DistanceUnit, Query, TableSchema};
//! use oxide_geo_sqlx::{Aggregate, AggregateFn, MySqlExecutor};
//! use sqlx::MySqlPool;
//!
//! #[derive(sqlx::FromRow)]
//! struct Place {
//!     id: i64,
//!     geom: String,
//!     _distance: f64,
//! }
//!
//! async fn example(pool: MySqlPool) -> oxide_geo_sqlx::Result<()> {
//!     let schema = Arc::new(TableSchema::from_json_file("places.json")?);
//!     let executor = MySqlExecutor::new(pool);
//!
//!     let mut compiler = executor.compiler(Query::new().from("places"), schema);
//!     compiler.nearest("52.52,13.40", "geom", 5.0, DistanceUnit::Kilometer)?;
//!
//!     // Nearest first, points as well-known text
//!     let places: Vec<Place> = executor.fetch_all(&compiler).await?;
//!
//!     // Aggregates see the same distance filter
//!     let total = executor.count(&mut compiler).await?;
//!     let mean = executor
//!         .aggregate(&mut compiler, &Aggregate::distance(AggregateFn::Avg))
//!         .await?;
//!     let stats = executor.distance_stats(&mut compiler).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod aggregates;
pub mod error;
pub mod executor;

pub use aggregates::{Aggregate, AggregateFn, DistanceStats};
pub use error::{ExecError, Result};
pub use executor::{MySqlExecutor, PgExecutor};
