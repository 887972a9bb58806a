#![allow(dead_code)]

use std::sync::Arc;

use oxide_geo_core::{Query, QueryCompiler, SchemaCatalog, TableSchema};

pub fn places() -> TableSchema {
    TableSchema::new("places")
        .column("id", "int")
        .column("name", "varchar(64)")
        .column("geom", "point")
        .column("location", "point")
}

pub fn catalog() -> Arc<dyn SchemaCatalog + Send + Sync> {
    Arc::new(places())
}

pub fn compiler(driver: &str) -> QueryCompiler {
    QueryCompiler::new(Query::new().from("places"), catalog(), driver)
}

pub fn compiler_for(query: Query, driver: &str) -> QueryCompiler {
    QueryCompiler::new(query, catalog(), driver)
}
