//! Query representation.
//!
//! # Example
//!
//! ```rust
//! use oxide_geo_core::builder::{Query, col};
//!
//! let (sql, params) = Query::new()
//!     .select(&["id", "name"])
//!     .from("places")
//!     .where_clause(col("open").eq(true))
//!     .build();
//!
//! assert_eq!(sql, "SELECT id, name FROM places WHERE open = ?");
//! assert_eq!(params.len(), 1);
//! ```

mod expr;
mod query;
pub mod value;

pub use expr::{col, Column, ExprBuilder};
pub use query::{FromSource, Join, JoinKind, OrderBy, OrderDirection, Query, SelectItem, Union};
pub use value::{SqlValue, ToSqlValue};
