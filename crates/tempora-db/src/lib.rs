//! # tempora-db
//!
//! PostgreSQL persistence layer for tempora.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for imports, entries, events, rules,
//!   analyses, and notifications
//! - The atomic claim repository guarding concurrent AI analysis
//!
//! ## Example
//!
//! ```rust,ignore
//! use tempora_db::Database;
//! use tempora_core::{ClaimRepository, TaskRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tempora").await?;
//!     let outcome = db.claims.claim_batch(&tasks, batch_id).await?;
//!     println!("claimed {} of {}", outcome.claimed.len(), tasks.len());
//!     Ok(())
//! }
//! ```

pub mod analyses;
pub mod claims;
pub mod entries;
pub mod events;
pub mod imports;
pub mod notifications;
pub mod pool;
pub mod rules;

// Test fixtures for integration tests.
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL.
pub mod test_fixtures;

// Re-export core types
pub use tempora_core::*;

// Re-export repository implementations
pub use analyses::PgAnalysisRepository;
pub use claims::PgClaimRepository;
pub use entries::PgEntryRepository;
pub use events::PgEventRepository;
pub use imports::PgImportRepository;
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use rules::PgRuleRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Import lifecycle repository.
    pub imports: PgImportRepository,
    /// Import entry repository.
    pub entries: PgEntryRepository,
    /// Canonical event repository.
    pub events: PgEventRepository,
    /// Claim/lock protocol over entries and events.
    pub claims: PgClaimRepository,
    /// Parsing rule repository.
    pub rules: PgRuleRepository,
    /// Optimization run and slot repository.
    pub analyses: PgAnalysisRepository,
    /// Notification repository.
    pub notifications: PgNotificationRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            imports: PgImportRepository::new(pool.clone()),
            entries: PgEntryRepository::new(pool.clone()),
            events: PgEventRepository::new(pool.clone()),
            claims: PgClaimRepository::new(pool.clone()),
            rules: PgRuleRepository::new(pool.clone()),
            analyses: PgAnalysisRepository::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
