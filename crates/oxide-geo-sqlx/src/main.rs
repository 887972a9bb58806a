//! oxide-geo CLI
//!
//! Compiles proximity searches against a table description and optionally
//! runs them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_geo_core::{
    CompilerConfig, Dialect, DistanceUnit, Query, QueryCompiler, SchemaCatalog, TableSchema,
    DEFAULT_RADIUS,
};
use oxide_geo_sqlx::{DistanceStats, MySqlExecutor, PgExecutor};

/// Proximity search for MySQL and PostgreSQL point columns.
#[derive(Parser)]
#[command(name = "oxide-geo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compiler settings (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL of a proximity search.
    Nearest {
        /// Table description (JSON).
        #[arg(short, long)]
        schema: PathBuf,

        /// Search center as "lat,lng".
        #[arg(short, long, allow_hyphen_values = true)]
        origin: String,

        /// Point column to measure from.
        #[arg(short, long, default_value = "geom")]
        attribute: String,

        /// Maximum distance.
        #[arg(short, long, default_value_t = DEFAULT_RADIUS)]
        radius: f64,

        /// Distance unit (km or mil).
        #[arg(short, long, default_value = "km")]
        unit: DistanceUnit,

        /// Columns to select (all if not specified).
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Driver name of the target connection.
        #[arg(short, long, env = "OXIDE_GEO_DRIVER", default_value = "mysql")]
        driver: String,

        /// Execute a count of the matching rows.
        #[arg(long, requires = "database")]
        count: bool,

        /// Execute the count and distance bounds of the matching rows.
        #[arg(long, requires = "database", conflicts_with = "count")]
        stats: bool,

        /// Database URL used with --count and --stats.
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// List the point columns of a table description.
    Schema {
        /// Table description (JSON).
        #[arg(short, long)]
        schema: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => CompilerConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => CompilerConfig::default(),
    };

    match cli.command {
        Commands::Nearest {
            schema,
            origin,
            attribute,
            radius,
            unit,
            select,
            driver,
            count,
            stats,
            database,
        } => {
            let table = load_schema(&schema)?;
            let mut compiler =
                QueryCompiler::new(base_query(&table, &select), Arc::new(table), driver.as_str())
                    .with_config(config);
            compiler.nearest(&origin, &attribute, radius, unit)?;

            let compiled = compiler.finalize()?;
            println!("{}", compiled.sql);
            for (i, param) in compiled.params.iter().enumerate() {
                println!("  {}: {param}", i + 1);
            }

            if count {
                let url = database.context("--count needs a database URL")?;
                let total = count_rows(&mut compiler, &url).await?;
                info!("{total} matching rows");
                println!("{total}");
            } else if stats {
                let url = database.context("--stats needs a database URL")?;
                let stats = distance_stats(&mut compiler, &url).await?;
                println!("count:    {}", stats.count);
                println!("nearest:  {}", format_distance(stats.nearest, unit));
                println!("mean:     {}", format_distance(stats.mean, unit));
                println!("farthest: {}", format_distance(stats.farthest, unit));
            }
        }

        Commands::Schema { schema } => {
            let table = load_schema(&schema)?;
            let points: Vec<&str> = table.point_columns().map(|c| c.name.as_str()).collect();
            if points.is_empty() {
                info!("No point columns in {}.", table.name);
            } else {
                println!("{}:", table.name);
                for name in points {
                    println!("  {name}");
                }
            }
        }
    }

    Ok(())
}

fn load_schema(path: &Path) -> anyhow::Result<TableSchema> {
    TableSchema::from_json_file(path).with_context(|| format!("reading {}", path.display()))
}

fn base_query(table: &TableSchema, select: &[String]) -> Query {
    let columns: Vec<&str> = select.iter().map(String::as_str).collect();
    Query::new().select(&columns).from(&table.name)
}

async fn count_rows(compiler: &mut QueryCompiler, url: &str) -> anyhow::Result<i64> {
    let total = match compiler.dialect()? {
        Dialect::MySql => {
            let pool = MySqlPoolOptions::new().max_connections(1).connect(url).await?;
            MySqlExecutor::new(pool).count(compiler).await?
        }
        Dialect::Postgres => {
            let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
            PgExecutor::new(pool).count(compiler).await?
        }
    };
    Ok(total)
}

async fn distance_stats(compiler: &mut QueryCompiler, url: &str) -> anyhow::Result<DistanceStats> {
    let stats = match compiler.dialect()? {
        Dialect::MySql => {
            let pool = MySqlPoolOptions::new().max_connections(1).connect(url).await?;
            MySqlExecutor::new(pool).distance_stats(compiler).await?
        }
        Dialect::Postgres => {
            let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
            PgExecutor::new(pool).distance_stats(compiler).await?
        }
    };
    Ok(stats)
}

fn format_distance(distance: Option<f64>, unit: DistanceUnit) -> String {
    distance.map_or_else(|| String::from("-"), |d| format!("{d:.3} {unit}"))
}
