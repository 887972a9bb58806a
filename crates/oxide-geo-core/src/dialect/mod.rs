//! SQL dialect support.
//!
//! MySQL and PostgreSQL expose different geospatial surfaces. Each dialect
//! provides a [`DistanceAdapter`] producing the fragments the proximity
//! compiler splices into the distance subquery.

mod mysql;
mod postgres;

use std::fmt;

pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;

use crate::builder::ExprBuilder;
use crate::error::{GeoError, Result};
use crate::proximity::Coordinate;

/// Source of the driver name identifying the target database.
pub trait Connection {
    /// Returns the driver name, e.g. `mysql` or `pgsql`.
    fn driver_name(&self) -> &str;
}

impl Connection for str {
    fn driver_name(&self) -> &str {
        self
    }
}

impl Connection for String {
    fn driver_name(&self) -> &str {
        self
    }
}

/// Trait for dialect-specific geospatial SQL.
pub trait DistanceAdapter {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Builds a point value for `origin`, with bound parameters.
    fn point_literal(&self, origin: Coordinate) -> ExprBuilder;

    /// Builds the native distance between `attribute` and `origin`.
    fn distance_expression(&self, attribute: &str, origin: Coordinate) -> ExprBuilder;

    /// Whether point columns must be re-projected to be read as text.
    fn projects_points_as_text(&self) -> bool;

    /// Builds a projection presenting a point column as text.
    fn text_projection(&self, column: &str) -> String;

    /// Returns the parameter placeholder for the 1-based position `index`.
    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }
}

/// A supported SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL and MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
}

impl Dialect {
    /// Resolves the dialect from a driver name.
    pub fn from_driver_name(driver: &str) -> Result<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(GeoError::UnsupportedDialect {
                driver: driver.to_string(),
            }),
        }
    }

    /// Resolves the dialect of a connection.
    pub fn of<C: Connection + ?Sized>(connection: &C) -> Result<Self> {
        Self::from_driver_name(connection.driver_name())
    }

    /// Returns the adapter for this dialect.
    #[must_use]
    pub fn adapter(self) -> &'static dyn DistanceAdapter {
        match self {
            Self::MySql => &MySqlAdapter,
            Self::Postgres => &PostgresAdapter,
        }
    }

    /// Renders `?` placeholders in the dialect's style.
    ///
    /// Question marks inside quoted literals or quoted identifiers are left
    /// untouched.
    #[must_use]
    pub fn render_placeholders(self, sql: &str) -> String {
        let adapter = self.adapter();
        let mut out = String::with_capacity(sql.len());
        let mut quote: Option<char> = None;
        let mut index = 0;

        for ch in sql.chars() {
            match quote {
                Some(q) if ch == q => {
                    quote = None;
                    out.push(ch);
                }
                Some(_) => out.push(ch),
                None if ch == '\'' || ch == '"' || ch == '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                None if ch == '?' => {
                    index += 1;
                    out.push_str(&adapter.placeholder(index));
                }
                None => out.push(ch),
            }
        }

        out
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.adapter().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_names() {
        assert_eq!(Dialect::from_driver_name("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("MariaDB").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("pgsql").unwrap(), Dialect::Postgres);
        assert_eq!(
            Dialect::from_driver_name("postgresql").unwrap(),
            Dialect::Postgres
        );
    }

    #[test]
    fn test_unsupported_driver_is_named() {
        let err = Dialect::from_driver_name("sqlite").unwrap_err();
        assert!(matches!(&err, GeoError::UnsupportedDialect { driver } if driver == "sqlite"));
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn test_connection_impls() {
        assert_eq!(Dialect::of("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::of(&String::from("pgsql")).unwrap(), Dialect::Postgres);
    }

    #[test]
    fn test_mysql_placeholders_unchanged() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert_eq!(Dialect::MySql.render_placeholders(sql), sql);
    }

    #[test]
    fn test_postgres_placeholders_numbered() {
        assert_eq!(
            Dialect::Postgres.render_placeholders("SELECT * FROM t WHERE a = ? AND b = '?' AND c < ?"),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c < $2"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Dialect::MySql.to_string(), "mysql");
        assert_eq!(Dialect::Postgres.to_string(), "postgresql");
    }
}
