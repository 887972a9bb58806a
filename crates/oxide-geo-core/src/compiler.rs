//! Query compiler: proximity search and finalization for one query.
//!
//! A [`QueryCompiler`] owns a base [`Query`] together with the schema of its
//! primary table and the driver name of the connection it will run on.
//! Proximity searches mutate the wrapped query in place; [`finalize`]
//! renders a copy with point columns projected as text.
//!
//! [`finalize`]: QueryCompiler::finalize

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::builder::{FromSource, Query, SelectItem, SqlValue};
use crate::dialect::{Connection, Dialect};
use crate::error::{GeoError, Result};
use crate::projection::{ProjectionMode, ProjectionRewriter, ProjectionStyle};
use crate::proximity::{
    validate_attribute, wrap_in_distance_subquery, Coordinate, DistanceUnit, OriginPolicy,
    ProximityRequest,
};
use crate::schema::SchemaCatalog;

/// Alias of the derived table used when a scalar query must be wrapped.
const SCALAR_ALIAS: &str = "c";

/// Compiler settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Behavior on a malformed origin.
    pub origin_policy: OriginPolicy,
    /// How wildcards are combined with point text projections.
    pub projection_style: ProjectionStyle,
}

impl CompilerConfig {
    /// Decodes settings from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// A rendered query ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with dialect placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<SqlValue>,
}

/// Wraps a base query with proximity search and point projection.
#[derive(Clone)]
pub struct QueryCompiler {
    query: Query,
    schema: Arc<dyn SchemaCatalog + Send + Sync>,
    driver: String,
    config: CompilerConfig,
    mode: ProjectionMode,
}

impl std::fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("query", &self.query)
            .field("table", &self.schema.table_name())
            .field("driver", &self.driver)
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish()
    }
}

impl QueryCompiler {
    /// Creates a compiler for `query` running on `connection`.
    ///
    /// The dialect is resolved lazily, so an unsupported driver only fails
    /// once a dialect-specific operation is requested.
    pub fn new<C: Connection + ?Sized>(
        query: Query,
        schema: Arc<dyn SchemaCatalog + Send + Sync>,
        connection: &C,
    ) -> Self {
        Self {
            query,
            schema,
            driver: connection.driver_name().to_string(),
            config: CompilerConfig::default(),
            mode: ProjectionMode::Normal,
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub const fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// The wrapped query.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Mutable access to the wrapped query.
    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Unwraps the query.
    #[must_use]
    pub fn into_query(self) -> Query {
        self.query
    }

    /// The schema of the primary table.
    #[must_use]
    pub fn schema(&self) -> &(dyn SchemaCatalog + Send + Sync) {
        self.schema.as_ref()
    }

    /// The connection's driver name.
    #[must_use]
    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    /// The settings.
    #[must_use]
    pub const fn config(&self) -> CompilerConfig {
        self.config
    }

    /// The current projection mode.
    #[must_use]
    pub const fn projection_mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Resolves the dialect from the driver name.
    pub fn dialect(&self) -> Result<Dialect> {
        Dialect::from_driver_name(&self.driver)
    }

    /// Restricts the query to rows whose `attribute` lies within `radius`
    /// of `origin` (`"lat,lng"`), nearest first.
    ///
    /// A malformed origin is handled according to
    /// [`CompilerConfig::origin_policy`]. Every error is raised before the
    /// query is touched.
    pub fn nearest(
        &mut self,
        origin: &str,
        attribute: &str,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<&mut Self> {
        let origin = match origin.parse::<Coordinate>() {
            Ok(origin) => origin,
            Err(err) => {
                if self.config.origin_policy == OriginPolicy::Reject {
                    return Err(err);
                }
                warn!(%err, "ignoring proximity search");
                return Ok(self);
            }
        };
        let request = ProximityRequest::new(origin, attribute)
            .radius(radius)
            .unit(unit);
        self.nearest_request(&request)
    }

    /// Applies an already parsed proximity search.
    pub fn nearest_request(&mut self, request: &ProximityRequest) -> Result<&mut Self> {
        let adapter = self.dialect()?.adapter();
        validate_attribute(&request.attribute)?;
        fill_primary_table(&mut self.query, self.schema.table_name());
        wrap_in_distance_subquery(&mut self.query, request, adapter);
        Ok(self)
    }

    /// Renders the query using the current projection mode.
    pub fn finalize(&self) -> Result<CompiledQuery> {
        self.finalize_with(self.mode)
    }

    /// Renders the query with an explicit projection mode.
    pub fn finalize_with(&self, mode: ProjectionMode) -> Result<CompiledQuery> {
        self.render(self.query.clone(), mode)
    }

    /// Builds the scalar form of the query selecting only `expression`.
    ///
    /// Without DISTINCT, GROUP BY or UNION the select list is replaced and
    /// ordering and paging are dropped; otherwise the query becomes a derived
    /// table: `SELECT expression FROM (query) c`.
    #[must_use]
    pub fn scalar_query(&self, expression: &str) -> Query {
        let mut query = self.query.clone();
        fill_primary_table(&mut query, self.schema.table_name());
        if !query.distinct && query.group_by.is_empty() && query.unions.is_empty() {
            let mut scalar = query;
            scalar.select = vec![SelectItem::raw(expression)];
            scalar.order_by.clear();
            scalar.limit = None;
            scalar.offset = None;
            scalar
        } else {
            Query::new()
                .add_select(SelectItem::raw(expression))
                .from_subquery(query, SCALAR_ALIAS)
        }
    }

    /// Renders the scalar form of the query using the current projection
    /// mode. Call it through a [`ScalarScope`].
    pub fn finalize_scalar(&self, expression: &str) -> Result<CompiledQuery> {
        self.render(self.scalar_query(expression), self.mode)
    }

    /// Enters scalar mode until the returned guard is dropped.
    pub fn scalar_scope(&mut self) -> ScalarScope<'_> {
        let prior = std::mem::replace(&mut self.mode, ProjectionMode::Suppressed);
        ScalarScope {
            compiler: self,
            prior,
        }
    }

    /// Runs a scalar query: the query is finalized in scalar mode and handed
    /// to `execute`. Errors from `execute` are returned unchanged and the
    /// projection mode is restored either way.
    pub fn query_scalar<T, E, F>(&mut self, expression: &str, execute: F) -> std::result::Result<T, E>
    where
        F: FnOnce(CompiledQuery) -> std::result::Result<T, E>,
        E: From<GeoError>,
    {
        let scope = self.scalar_scope();
        let compiled = scope.finalize_scalar(expression)?;
        execute(compiled)
    }

    fn render(&self, mut query: Query, mode: ProjectionMode) -> Result<CompiledQuery> {
        let dialect = self.dialect()?;
        fill_primary_table(&mut query, self.schema.table_name());
        ProjectionRewriter::new(self.schema.as_ref(), dialect.adapter(), self.config.projection_style)
            .rewrite(&mut query, mode);
        let (sql, params) = query.build();
        let sql = dialect.render_placeholders(&sql);
        debug!(%dialect, ?mode, %sql, params = params.len(), "finalized query");
        Ok(CompiledQuery { sql, params })
    }
}

/// A query without FROM reads from the primary table.
fn fill_primary_table(query: &mut Query, table: &str) {
    if query.from.is_empty() {
        query.from.push(FromSource::Table {
            name: table.to_string(),
            alias: None,
        });
    }
}

/// Scalar execution mode for a [`QueryCompiler`].
///
/// While the guard lives the top-level select list is not rewritten, so an
/// aggregate such as `COUNT(*)` is not joined by point projections. Dropping
/// the guard restores the previous mode, including on early return and
/// unwinding.
#[derive(Debug)]
pub struct ScalarScope<'a> {
    compiler: &'a mut QueryCompiler,
    prior: ProjectionMode,
}

impl Deref for ScalarScope<'_> {
    type Target = QueryCompiler;

    fn deref(&self) -> &QueryCompiler {
        self.compiler
    }
}

impl DerefMut for ScalarScope<'_> {
    fn deref_mut(&mut self) -> &mut QueryCompiler {
        self.compiler
    }
}

impl Drop for ScalarScope<'_> {
    fn drop(&mut self) {
        self.compiler.mode = self.prior;
    }
}
