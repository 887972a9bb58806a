//! Pool-backed executors for MySQL and PostgreSQL.
//!
//! Each executor wraps a sqlx pool, reports the driver name the compiler
//! resolves its dialect from, and runs finalized queries with their
//! parameters bound in order.

use std::sync::Arc;

use oxide_geo_core::{
    CompiledQuery, Connection, Query, QueryCompiler, SchemaCatalog, SqlValue,
};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, Row};
use tracing::debug;

use crate::aggregates::{Aggregate, DistanceStats};
use crate::error::Result;

/// Binds every `SqlValue` of a compiled query, in order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlValue::Null => query.bind(Option::<i64>::None),
                SqlValue::Bool(b) => query.bind(b),
                SqlValue::Int(i) => query.bind(i),
                SqlValue::Float(f) => query.bind(f),
                SqlValue::Text(s) => query.bind(s),
            };
        }
        query
    }};
}

macro_rules! executor {
    ($(#[$doc:meta])* $name:ident, $pool:ty, $row:ty, $driver:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pool: $pool,
        }

        impl $name {
            /// Wraps a connection pool.
            #[must_use]
            pub const fn new(pool: $pool) -> Self {
                Self { pool }
            }

            /// The underlying pool.
            #[must_use]
            pub const fn pool(&self) -> &$pool {
                &self.pool
            }

            /// Creates a compiler for `query` bound to this connection.
            #[must_use]
            pub fn compiler(
                &self,
                query: Query,
                schema: Arc<dyn SchemaCatalog + Send + Sync>,
            ) -> QueryCompiler {
                QueryCompiler::new(query, schema, self)
            }

            /// Executes the query and returns all matching rows.
            pub async fn fetch_all<T>(&self, compiler: &QueryCompiler) -> Result<Vec<T>>
            where
                T: for<'r> FromRow<'r, $row> + Send + Unpin,
            {
                let CompiledQuery { sql, params } = compiler.finalize()?;
                debug!(driver = $driver, %sql, "fetch_all");
                let rows = bind_params!(sqlx::query_as::<_, T>(&sql), params)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows)
            }

            /// Returns the first matching row, or None if no rows match.
            pub async fn fetch_optional<T>(&self, compiler: &QueryCompiler) -> Result<Option<T>>
            where
                T: for<'r> FromRow<'r, $row> + Send + Unpin,
            {
                let CompiledQuery { sql, params } = compiler.finalize()?;
                debug!(driver = $driver, %sql, "fetch_optional");
                let row = bind_params!(sqlx::query_as::<_, T>(&sql), params)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row)
            }

            /// Returns the count of matching rows.
            ///
            /// Runs in scalar mode, so point projections never join the
            /// `COUNT(*)` select list.
            pub async fn count(&self, compiler: &mut QueryCompiler) -> Result<i64> {
                let scope = compiler.scalar_scope();
                let CompiledQuery { sql, params } = scope.finalize_scalar("COUNT(*)")?;
                debug!(driver = $driver, %sql, "count");
                let row = bind_params!(sqlx::query(&sql), params)
                    .fetch_one(&self.pool)
                    .await;
                drop(scope);
                Ok(row?.try_get::<i64, _>(0)?)
            }

            /// Returns whether any rows match the query.
            pub async fn exists(&self, compiler: &mut QueryCompiler) -> Result<bool> {
                Ok(self.count(compiler).await? > 0)
            }

            /// Evaluates an aggregate over the query. NULL, e.g. the average
            /// of no rows, comes back as None.
            pub async fn aggregate(
                &self,
                compiler: &mut QueryCompiler,
                aggregate: &Aggregate,
            ) -> Result<Option<f64>> {
                let expression = aggregate.to_float_sql(compiler.dialect()?);
                let scope = compiler.scalar_scope();
                let CompiledQuery { sql, params } = scope.finalize_scalar(&expression)?;
                debug!(driver = $driver, %sql, "aggregate");
                let row = bind_params!(sqlx::query(&sql), params)
                    .fetch_one(&self.pool)
                    .await;
                drop(scope);
                Ok(row?.try_get::<Option<f64>, _>(0)?)
            }

            /// Count and distance bounds of a proximity search, in one
            /// round trip. The query must have been passed through
            /// [`QueryCompiler::nearest`].
            pub async fn distance_stats(&self, compiler: &mut QueryCompiler) -> Result<DistanceStats> {
                let expression = DistanceStats::select_sql(compiler.dialect()?);
                let scope = compiler.scalar_scope();
                let CompiledQuery { sql, params } = scope.finalize_scalar(&expression)?;
                debug!(driver = $driver, %sql, "distance_stats");
                let row = bind_params!(sqlx::query(&sql), params)
                    .fetch_one(&self.pool)
                    .await;
                drop(scope);
                let row = row?;
                Ok(DistanceStats {
                    count: row.try_get(0)?,
                    nearest: row.try_get(1)?,
                    mean: row.try_get(2)?,
                    farthest: row.try_get(3)?,
                })
            }
        }

        impl Connection for $name {
            fn driver_name(&self) -> &str {
                $driver
            }
        }
    };
}

executor!(
    /// Runs compiled queries on a MySQL or MariaDB pool.
    MySqlExecutor,
    MySqlPool,
    MySqlRow,
    "mysql"
);

executor!(
    /// Runs compiled queries on a PostgreSQL pool.
    PgExecutor,
    PgPool,
    PgRow,
    "pgsql"
);

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_geo_core::{Dialect, DistanceUnit, TableSchema};

    fn schema() -> Arc<dyn SchemaCatalog + Send + Sync> {
        Arc::new(
            TableSchema::new("places")
                .column("id", "int")
                .column("geom", "point"),
        )
    }

    #[tokio::test]
    async fn test_mysql_driver_name() {
        let pool = MySqlPool::connect_lazy("mysql://root@localhost/geo").unwrap();
        let executor = MySqlExecutor::new(pool);
        assert_eq!(executor.driver_name(), "mysql");

        let compiler = executor.compiler(Query::new().from("places"), schema());
        assert_eq!(compiler.dialect().unwrap(), Dialect::MySql);
    }

    #[tokio::test]
    async fn test_pg_compiler_renders_numbered_placeholders() {
        let pool = PgPool::connect_lazy("postgres://postgres@localhost/geo").unwrap();
        let executor = PgExecutor::new(pool);

        let mut compiler = executor.compiler(Query::new().from("places"), schema());
        compiler
            .nearest("1,2", "geom", 3.0, DistanceUnit::Kilometer)
            .unwrap();
        let compiled = compiler.finalize().unwrap();
        assert!(compiled.sql.contains("point($1, $2)"));
        assert!(compiled.sql.contains("_distance < $3"));
    }

    #[tokio::test]
    async fn test_distance_stats_query_keeps_filter() {
        let pool = PgPool::connect_lazy("postgres://postgres@localhost/geo").unwrap();
        let executor = PgExecutor::new(pool);

        let mut compiler = executor.compiler(Query::new().from("places"), schema());
        compiler
            .nearest("1,2", "geom", 3.0, DistanceUnit::Kilometer)
            .unwrap();
        let expression = DistanceStats::select_sql(compiler.dialect().unwrap());
        let compiled = compiler.scalar_scope().finalize_scalar(&expression).unwrap();

        assert!(compiled.sql.starts_with(
            "SELECT COUNT(*), CAST(MIN(_distance) AS DOUBLE PRECISION)"
        ));
        assert!(compiled.sql.ends_with("distance WHERE _distance < $3"));
        assert_eq!(compiled.params.len(), 3);
    }
}
