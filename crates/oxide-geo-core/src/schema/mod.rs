//! Table metadata consulted by the compiler.
//!
//! The compiler only needs to know the primary table name and which columns
//! hold point geometries. Any introspection layer can provide that through
//! [`SchemaCatalog`]; [`TableSchema`] is the in-memory implementation, which
//! can also be loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Trait for per-table column metadata.
pub trait SchemaCatalog {
    /// The primary table name.
    fn table_name(&self) -> &str;

    /// All columns, in declaration order.
    fn all_columns(&self) -> &[ColumnSchema];

    /// Looks up a column by its bare name.
    fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.all_columns().iter().find(|c| c.name == name)
    }

    /// Iterates over the point-typed columns, in declaration order.
    fn point_columns(&self) -> Box<dyn Iterator<Item = &ColumnSchema> + '_> {
        Box::new(self.all_columns().iter().filter(|c| c.is_point()))
    }
}

/// Metadata for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Database type as reported by the server, e.g. `point` or `int`.
    #[serde(rename = "type", default)]
    pub data_type: String,
    /// Forces point handling regardless of `data_type`.
    #[serde(default)]
    pub point: bool,
}

impl ColumnSchema {
    /// Creates a column description.
    #[must_use]
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            point: false,
        }
    }

    /// Returns whether this column stores a point geometry.
    ///
    /// Matches `point` and the PostGIS spelling `geometry(Point, ...)`,
    /// case-insensitively.
    #[must_use]
    pub fn is_point(&self) -> bool {
        if self.point {
            return true;
        }
        let ty = self.data_type.trim().to_ascii_lowercase();
        ty == "point" || ty.starts_with("geometry(point")
    }
}

/// An in-memory table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a table without columns.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, name: &str, data_type: &str) -> Self {
        self.columns.push(ColumnSchema::new(name, data_type));
        self
    }

    /// Decodes a table description from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a table description from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl SchemaCatalog for TableSchema {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn all_columns(&self) -> &[ColumnSchema] {
        &self.columns
    }
}
