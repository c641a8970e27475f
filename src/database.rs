use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

const REQUIRED_TABLES: [&str; 4] = ["areas", "categories", "projects", "todos"];

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");

        Ok(Database { pool })
    }

    /// Warns about missing tables; the service still starts so that
    /// `/health` can report the problem.
    pub async fn check_tables(&self) -> Result<()> {
        log::info!("📋 Checking database tables...");

        let rows = sqlx::query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = ANY($1)
            ORDER BY table_name
            "#,
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(&self.pool)
        .await
        .context("Failed to check database tables")?;

        let found: Vec<String> = rows
            .iter()
            .map(|row| row.get::<String, _>("table_name"))
            .collect();

        log::info!("📊 Found tables: {:?}", found);

        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|table| !found.iter().any(|name| name == table))
            .collect();
        if missing.is_empty() {
            log::info!("✅ All required tables exist");
        } else {
            log::warn!("⚠️  Missing tables: {:?}", missing);
            log::warn!("   Run schema.sql against the database to create them");
        }

        Ok(())
    }
}
