//! Point column projection.
//!
//! MySQL returns geometry columns in its internal binary format. Before a
//! query is rendered, every point column it reads is re-projected as
//! `ST_AsText(col) AS col` so callers always receive well-known text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{ExprBuilder, FromSource, Query, SelectItem};
use crate::dialect::DistanceAdapter;
use crate::schema::SchemaCatalog;

static TRAILING_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s+(\w+)$").unwrap());

/// How wildcard selections are combined with text projections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionStyle {
    /// Keep `alias.*` and append `ST_AsText(col) AS col` for each point
    /// column. The result carries duplicate column names; drivers resolve
    /// them to the last occurrence, which is the text projection.
    #[default]
    Additive,
    /// Expand the wildcard into an explicit column list with point columns
    /// replaced in place. No duplicate names are emitted.
    Replace,
}

/// Whether the rewriter runs for the top-level select list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Point columns are projected as text.
    #[default]
    Normal,
    /// Scalar and aggregate queries: the top-level select list is kept.
    Suppressed,
}

/// Resolves the name under which the primary table is visible.
///
/// The first FROM source wins: its explicit alias, else the trailing word of
/// a `"name alias"` string, else the table name. Without a FROM clause the
/// catalog's table name is used.
#[must_use]
pub fn primary_alias(query: &Query, default_table: &str) -> String {
    match query.from_sources().first() {
        None => default_table.to_string(),
        Some(FromSource::Subquery { alias, .. }) => alias.clone(),
        Some(FromSource::Table {
            alias: Some(alias), ..
        }) => alias.clone(),
        Some(FromSource::Table { name, alias: None }) => visible_name(name),
    }
}

/// Names under which the joined tables are visible, in join order.
fn join_aliases(query: &Query) -> Vec<String> {
    query.joins().iter().map(|join| visible_name(&join.table)).collect()
}

fn visible_name(table: &str) -> String {
    TRAILING_ALIAS
        .captures(table.trim())
        .and_then(|caps| caps.get(2))
        .map_or_else(|| table.trim().to_string(), |m| m.as_str().to_string())
}

/// Rewrites select lists so point columns come back as text.
pub struct ProjectionRewriter<'a> {
    schema: &'a dyn SchemaCatalog,
    adapter: &'a dyn DistanceAdapter,
    style: ProjectionStyle,
}

impl<'a> ProjectionRewriter<'a> {
    /// Creates a rewriter for one table and dialect.
    #[must_use]
    pub fn new(
        schema: &'a dyn SchemaCatalog,
        adapter: &'a dyn DistanceAdapter,
        style: ProjectionStyle,
    ) -> Self {
        Self {
            schema,
            adapter,
            style,
        }
    }

    /// Rewrites `query` and the derived tables it reads from.
    ///
    /// Derived tables are always rewritten in [`ProjectionStyle::Replace`],
    /// since a derived table may not expose duplicate column names. A level
    /// that reads from a derived table already receives text and is left
    /// alone.
    pub fn rewrite(&self, query: &mut Query, mode: ProjectionMode) {
        if !self.adapter.projects_points_as_text() {
            return;
        }
        let reads_derived = self.rewrite_derived_sources(query);
        if mode == ProjectionMode::Suppressed {
            debug!("projection rewrite suppressed");
            return;
        }
        if !reads_derived {
            self.rewrite_level(query, self.style);
        }
    }

    fn rewrite_derived_sources(&self, query: &mut Query) -> bool {
        let mut reads_derived = false;
        for (i, source) in query.from.iter_mut().enumerate() {
            if let FromSource::Subquery { query: inner, .. } = source {
                reads_derived |= i == 0;
                if !self.rewrite_derived_sources(inner) {
                    self.rewrite_level(inner, ProjectionStyle::Replace);
                }
            }
        }
        reads_derived
    }

    fn rewrite_level(&self, query: &mut Query, style: ProjectionStyle) {
        let alias = primary_alias(query, self.schema.table_name());
        let joined = join_aliases(query);
        let requested: Vec<SelectItem> = if query.select.is_empty() {
            std::iter::once(&alias)
                .chain(&joined)
                .map(|table| SelectItem::column(&format!("{table}.*")))
                .collect()
        } else {
            std::mem::take(&mut query.select)
        };

        let mut select = Vec::with_capacity(requested.len());
        let mut appended: HashSet<String> = HashSet::new();
        let mut trailing = Vec::new();

        for item in requested {
            let own_wildcard = item.wildcard().map(|q| q.is_none_or(|q| q == alias));
            match own_wildcard {
                Some(true) => match style {
                    ProjectionStyle::Additive => {
                        select.push(item);
                        for column in self.schema.point_columns() {
                            if appended.insert(column.name.clone()) {
                                trailing.push(self.cast(&column.name, &column.name));
                            }
                        }
                    }
                    ProjectionStyle::Replace => self.expand(&alias, &joined, item, &mut select),
                },
                Some(false) => select.push(item),
                None => select.push(self.replace_column(item)),
            }
        }

        select.extend(trailing);
        debug!(table = %alias, style = ?style, items = select.len(), "projected point columns as text");
        query.select = select;
    }

    /// Expands a wildcard over the primary table. A bare `*` also covers the
    /// joined tables, which keep their own `alias.*`.
    fn expand(
        &self,
        alias: &str,
        joined: &[String],
        wildcard: SelectItem,
        select: &mut Vec<SelectItem>,
    ) {
        let columns = self.schema.all_columns();
        if columns.is_empty() {
            select.push(wildcard);
            return;
        }
        let bare = wildcard.wildcard() == Some(None);
        for column in columns {
            let qualified = format!("{alias}.{}", column.name);
            if column.is_point() {
                select.push(self.cast(&qualified, &column.name));
            } else {
                select.push(SelectItem::column(&qualified));
            }
        }
        if bare {
            select.extend(joined.iter().map(|table| SelectItem::column(&format!("{table}.*"))));
        }
    }

    fn replace_column(&self, item: SelectItem) -> SelectItem {
        let (name, alias) = match item {
            SelectItem::Column { name, alias } => (name, alias),
            other => return other,
        };
        let bare = name.rsplit('.').next().unwrap_or(&name);
        match self.schema.get_column(bare) {
            Some(column) if column.is_point() => {
                let output = alias.as_deref().unwrap_or(bare);
                self.cast(&name, output)
            }
            _ => SelectItem::Column { name, alias },
        }
    }

    fn cast(&self, column: &str, output: &str) -> SelectItem {
        SelectItem::expr(ExprBuilder::raw(self.adapter.text_projection(column)), output)
    }
}
