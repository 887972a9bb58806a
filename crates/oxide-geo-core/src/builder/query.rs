//! Mutable SELECT query.
//!
//! Unlike a typestate builder, a `Query` can be rewritten after the fact:
//! the proximity compiler swaps its FROM source for a derived table and the
//! projection rewriter edits its select list at finalize time.

use super::expr::ExprBuilder;
use super::value::SqlValue;

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by
    pub column: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses an order specification; a `-` prefix means descending.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }

    /// Returns the SQL representation.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self.direction {
            OrderDirection::Asc => format!("{} ASC", self.column),
            OrderDirection::Desc => format!("{} DESC", self.column),
        }
    }
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// A column reference such as `geom`, `p.geom`, `*` or `p.*`.
    Column {
        /// Column name, optionally table-qualified.
        name: String,
        /// Output alias.
        alias: Option<String>,
    },
    /// A raw expression; never inspected by the projection rewriter.
    Expr {
        /// The expression and its bound values.
        expr: ExprBuilder,
        /// Output alias.
        alias: Option<String>,
    },
    /// A scalar subquery.
    Subquery {
        /// The nested query.
        query: Box<Query>,
        /// Output alias.
        alias: String,
    },
}

impl SelectItem {
    /// A plain column reference.
    #[must_use]
    pub fn column(name: &str) -> Self {
        Self::Column {
            name: name.to_string(),
            alias: None,
        }
    }

    /// A column reference with an output alias.
    #[must_use]
    pub fn aliased(name: &str, alias: &str) -> Self {
        Self::Column {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// An aliased expression.
    #[must_use]
    pub fn expr(expr: ExprBuilder, alias: &str) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias.to_string()),
        }
    }

    /// A raw SQL expression without alias, e.g. `COUNT(*)`.
    #[must_use]
    pub fn raw(sql: &str) -> Self {
        Self::Expr {
            expr: ExprBuilder::raw(sql),
            alias: None,
        }
    }

    /// Returns the wildcard qualifier when this item is `*` (`Some(None)`)
    /// or `table.*` (`Some(Some(table))`).
    #[must_use]
    pub fn wildcard(&self) -> Option<Option<&str>> {
        match self {
            Self::Column { name, .. } if name == "*" => Some(None),
            Self::Column { name, .. } => name.strip_suffix(".*").map(Some),
            _ => None,
        }
    }

    fn render(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Self::Column { name, alias } => {
                sql.push_str(name);
                if let Some(alias) = alias {
                    sql.push_str(" AS ");
                    sql.push_str(alias);
                }
            }
            Self::Expr { expr, alias } => {
                sql.push_str(expr.sql());
                params.extend(expr.params().iter().cloned());
                if let Some(alias) = alias {
                    sql.push_str(" AS ");
                    sql.push_str(alias);
                }
            }
            Self::Subquery { query, alias } => {
                let (inner, inner_params) = query.build();
                sql.push('(');
                sql.push_str(&inner);
                sql.push_str(") AS ");
                sql.push_str(alias);
                params.extend(inner_params);
            }
        }
    }
}

/// A FROM source.
#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    /// A table, written either as a bare name or as `"name alias"`.
    Table {
        /// Table name (may carry a trailing alias word).
        name: String,
        /// Explicit alias.
        alias: Option<String>,
    },
    /// A derived table.
    Subquery {
        /// The nested query.
        query: Box<Query>,
        /// Alias of the derived table.
        alias: String,
    },
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Join flavour.
    pub kind: JoinKind,
    /// Joined table, optionally with alias.
    pub table: String,
    /// ON condition.
    pub on: String,
}

/// A UNION member.
#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    /// The query appended with UNION.
    pub query: Box<Query>,
    /// Whether duplicates are kept (UNION ALL).
    pub all: bool,
}

/// A mutable SELECT query rendered with `?` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) select: Vec<SelectItem>,
    pub(crate) from: Vec<FromSource>,
    pub(crate) joins: Vec<Join>,
    pub(crate) where_clause: Option<ExprBuilder>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: bool,
    pub(crate) unions: Vec<Union>,
}

impl Query {
    /// Creates an empty query. An empty select list means "all columns".
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the select list with plain column references.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = columns.iter().map(|c| SelectItem::column(c)).collect();
        self
    }

    /// Appends an item to the select list.
    #[must_use]
    pub fn add_select(mut self, item: SelectItem) -> Self {
        self.select.push(item);
        self
    }

    /// Sets the FROM table. `"places p"` carries an alias.
    #[must_use]
    pub fn from(mut self, table: &str) -> Self {
        self.from = vec![FromSource::Table {
            name: table.to_string(),
            alias: None,
        }];
        self
    }

    /// Sets the FROM table with an explicit alias.
    #[must_use]
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.from = vec![FromSource::Table {
            name: table.to_string(),
            alias: Some(alias.to_string()),
        }];
        self
    }

    /// Uses another query as the FROM source.
    #[must_use]
    pub fn from_subquery(mut self, query: Self, alias: &str) -> Self {
        self.set_from_subquery(query, alias);
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn join(mut self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Inner, table, on);
        self
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(mut self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Left, table, on);
        self
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(mut self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Right, table, on);
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Self {
        self.where_clause = Some(expr);
        self
    }

    /// ANDs a condition onto the existing WHERE clause.
    #[must_use]
    pub fn and_where(mut self, expr: ExprBuilder) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.paren().and(expr.paren()),
            None => expr,
        });
        self
    }

    /// Sets the GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Appends an ordering; prefix with `-` for descending.
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse(spec));
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Appends a UNION member.
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        self.unions.push(Union {
            query: Box::new(other),
            all: false,
        });
        self
    }

    /// Appends a UNION ALL member.
    #[must_use]
    pub fn union_all(mut self, other: Self) -> Self {
        self.unions.push(Union {
            query: Box::new(other),
            all: true,
        });
        self
    }

    fn push_join(&mut self, kind: JoinKind, table: &str, on: &str) {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            on: on.to_string(),
        });
    }

    pub(crate) fn set_from_subquery(&mut self, query: Self, alias: &str) {
        self.from = vec![FromSource::Subquery {
            query: Box::new(query),
            alias: alias.to_string(),
        }];
    }

    /// The select list; empty means all columns.
    #[must_use]
    pub fn select_items(&self) -> &[SelectItem] {
        &self.select
    }

    /// The FROM sources.
    #[must_use]
    pub fn from_sources(&self) -> &[FromSource] {
        &self.from
    }

    /// The JOIN clauses.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// The WHERE clause.
    #[must_use]
    pub const fn where_expr(&self) -> Option<&ExprBuilder> {
        self.where_clause.as_ref()
    }

    /// The GROUP BY columns.
    #[must_use]
    pub fn group_by_columns(&self) -> &[String] {
        &self.group_by
    }

    /// The ORDER BY specifications.
    #[must_use]
    pub fn orderings(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// The LIMIT.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// The OFFSET.
    #[must_use]
    pub const fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Whether DISTINCT is set.
    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// The UNION members.
    #[must_use]
    pub fn unions(&self) -> &[Union] {
        &self.unions
    }

    /// Returns the derived table this query reads from, if its first FROM
    /// source is a subquery.
    #[must_use]
    pub fn derived_source(&self) -> Option<(&Self, &str)> {
        match self.from.first() {
            Some(FromSource::Subquery { query, alias }) => Some((&**query, alias.as_str())),
            _ => None,
        }
    }

    /// Renders the query with `?` placeholders.
    #[must_use]
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("SELECT ");
        let mut params = vec![];

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.select.is_empty() {
            sql.push('*');
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            item.render(&mut sql, &mut params);
        }

        for (i, source) in self.from.iter().enumerate() {
            sql.push_str(if i == 0 { " FROM " } else { ", " });
            match source {
                FromSource::Table { name, alias } => {
                    sql.push_str(name);
                    if let Some(alias) = alias {
                        sql.push(' ');
                        sql.push_str(alias);
                    }
                }
                FromSource::Subquery { query, alias } => {
                    let (inner, inner_params) = query.build();
                    sql.push('(');
                    sql.push_str(&inner);
                    sql.push_str(") ");
                    sql.push_str(alias);
                    params.extend(inner_params);
                }
            }
        }

        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "INNER JOIN",
                JoinKind::Left => "LEFT JOIN",
                JoinKind::Right => "RIGHT JOIN",
            };
            sql.push_str(&format!(" {keyword} {} ON {}", join.table, join.on));
        }

        if let Some(ref where_expr) = self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(where_expr.sql());
            params.extend(where_expr.params().iter().cloned());
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let parts: Vec<String> = self.order_by.iter().map(OrderBy::to_sql).collect();
            sql.push_str(&parts.join(", "));
        }

        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        if let Some(n) = self.offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }

        if !self.unions.is_empty() {
            sql = format!("({sql})");
            for union in &self.unions {
                let (other, other_params) = union.query.build();
                let keyword = if union.all { "UNION ALL" } else { "UNION" };
                sql.push_str(&format!(" {keyword} ({other})"));
                params.extend(other_params);
            }
        }

        (sql, params)
    }
}
