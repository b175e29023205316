//! SQLite database with Diesel ORM
//!
//! Stores verdicts so they can be listed, revisited and rendered as
//! certificates later. Checks and modality details are kept as JSON text
//! exactly as the analyzer produced them.

use crate::analyzer::{
    AuthenticityLabel, Check, FileAnalysis, Modality, ModalityDetails, ModalityResult,
    SentimentLabel,
};
use crate::report::html::CertificateRecord;
use crate::schema::*;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_DB_PATH: &str = "verisight.db";

/// `file_type` value for results whose modality could not be determined
const UNKNOWN_FILE_TYPE: &str = "unknown";

/// Current analysis schema version
pub const CURRENT_SCHEMA: AnalysisSchema = AnalysisSchema {
    major: 1,
    minor: 0,
    patch: 0,
    name: "forensic-verdict",
    features: &[
        "exif_metadata",
        "error_level_analysis",
        "luminance_noise",
        "channel_correlation",
        "region_texture",
        "spectral_flatness",
        "frequency_cutoff",
        "breath_gaps",
        "sentence_burstiness",
        "character_entropy",
        "punctuation_density",
        "lexicon_sentiment",
    ],
};

/// Describes the version and capabilities of an analysis
#[derive(Debug, Clone)]
pub struct AnalysisSchema {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl AnalysisSchema {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    pub fn version_tuple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for AnalysisSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable schema version
#[derive(Insertable)]
#[diesel(table_name = schema_versions)]
pub struct NewSchemaVersion<'a> {
    pub version: &'a str,
    pub name: &'a str,
    pub features: &'a str,
    pub introduced_at: &'a str,
}

/// Queryable schema version
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = schema_versions)]
pub struct StoredSchema {
    pub id: i32,
    pub version: String,
    pub name: String,
    pub features: String,
    pub introduced_at: String,
}

impl StoredSchema {
    /// `major.minor.patch`, or None for anything else
    pub fn version_tuple(&self) -> Option<(u32, u32, u32)> {
        let mut parts = self.version.split('.').map(|p| p.parse::<u32>().ok());
        let version = (parts.next()??, parts.next()??, parts.next()??);
        match parts.next() {
            None => Some(version),
            Some(_) => None,
        }
    }

    pub fn is_newer_than(&self, schema: &AnalysisSchema) -> bool {
        self.version_tuple().is_some_and(|v| v > schema.version_tuple())
    }
}

/// Insertable analysis result
#[derive(Insertable)]
#[diesel(table_name = analysis_results)]
pub struct NewAnalysisRecord<'a> {
    pub file_name: &'a str,
    pub file_type: &'a str,
    pub sentiment_label: &'a str,
    pub sentiment_score: i32,
    pub authenticity_label: &'a str,
    pub authenticity_score: i32,
    pub reasoning: &'a str,
    pub checks_json: &'a str,
    pub details_json: &'a str,
    pub analyzed_at: &'a str,
    pub schema_version: &'a str,
}

/// Queryable analysis result (database record)
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = analysis_results)]
pub struct StoredAnalysis {
    pub id: i32,
    pub file_name: String,
    pub file_type: String,
    pub sentiment_label: String,
    pub sentiment_score: i32,
    pub authenticity_label: String,
    pub authenticity_score: i32,
    pub reasoning: String,
    pub checks_json: String,
    pub details_json: String,
    pub analyzed_at: String,
    pub schema_version: String,
}

impl StoredAnalysis {
    pub fn modality(&self) -> Option<Modality> {
        Modality::from_tag(&self.file_type)
    }

    /// Rebuild the analyzer's result. Checks come back in stored order.
    pub fn to_result(&self) -> Result<ModalityResult> {
        let sentiment_label = SentimentLabel::parse(&self.sentiment_label)
            .ok_or_else(|| DbError::Corrupt(format!("sentiment label {:?}", self.sentiment_label)))?;
        let authenticity_label = AuthenticityLabel::parse(&self.authenticity_label).ok_or_else(|| {
            DbError::Corrupt(format!("authenticity label {:?}", self.authenticity_label))
        })?;
        let checks: Vec<Check> = serde_json::from_str(&self.checks_json)?;
        let details: ModalityDetails = serde_json::from_str(&self.details_json)?;

        Ok(ModalityResult {
            sentiment_label,
            sentiment_score: self.sentiment_score.max(0) as u32,
            authenticity_label,
            authenticity_score: self.authenticity_score.max(0) as u32,
            reasoning: self.reasoning.clone(),
            checks,
            details,
        })
    }

    pub fn to_certificate(&self) -> Result<CertificateRecord> {
        Ok(CertificateRecord {
            id: Some(self.id),
            file_name: self.file_name.clone(),
            modality: self.modality(),
            analyzed_at: self.analyzed_at.clone(),
            result: self.to_result()?,
        })
    }
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row that no longer maps onto the result types
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Helper for raw SQL avg query
#[derive(QueryableByName)]
struct AvgResult {
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Double>)]
    avg: Option<f64>,
}

impl Database {
    /// Get the default database path
    pub fn db_path() -> std::path::PathBuf {
        std::path::PathBuf::from(DEFAULT_DB_PATH)
    }

    /// Open database at default path
    pub fn open() -> Result<Self> {
        Self::open_at(DEFAULT_DB_PATH)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        for newer in db.newer_schemas()? {
            warn!(
                stored = %newer.version,
                current = %CURRENT_SCHEMA,
                "database holds results from a newer analysis schema"
            );
        }
        info!(path = %path_str, schema = %CURRENT_SCHEMA, "database ready");
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                features TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS analysis_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                sentiment_label TEXT NOT NULL,
                sentiment_score INTEGER NOT NULL,
                authenticity_label TEXT NOT NULL,
                authenticity_score INTEGER NOT NULL,
                reasoning TEXT NOT NULL,
                checks_json TEXT NOT NULL,
                details_json TEXT NOT NULL,
                analyzed_at TEXT NOT NULL,
                schema_version TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_authenticity ON analysis_results(authenticity_label)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_file_type ON analysis_results(file_type)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_analyzed_at ON analysis_results(analyzed_at)").execute(&mut conn)?;

        self.register_schema(&CURRENT_SCHEMA)?;
        Ok(())
    }

    fn register_schema(&self, schema: &AnalysisSchema) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();
        let features_json = serde_json::to_string(&schema.features)?;

        let new_schema = NewSchemaVersion {
            version: &schema.version_string(),
            name: schema.name,
            features: &features_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(schema_versions::table)
            .values(&new_schema)
            .execute(&mut conn)?;

        Ok(())
    }

    pub fn get_schemas(&self) -> Result<Vec<StoredSchema>> {
        let mut conn = self.get_conn()?;
        let schemas = schema_versions::table
            .order(schema_versions::id.asc())
            .load::<StoredSchema>(&mut conn)?;
        Ok(schemas)
    }

    /// Registered schemas newer than [`CURRENT_SCHEMA`]
    pub fn newer_schemas(&self) -> Result<Vec<StoredSchema>> {
        Ok(self
            .get_schemas()?
            .into_iter()
            .filter(|s| s.is_newer_than(&CURRENT_SCHEMA))
            .collect())
    }

    // ========================================================================
    // Analysis Results
    // ========================================================================

    /// Store an analysis result, returning its id
    pub fn insert_result(&self, analysis: &FileAnalysis) -> Result<i32> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();
        let result = &analysis.result;

        let checks_json = serde_json::to_string(&result.checks)?;
        let details_json = serde_json::to_string(&result.details)?;
        let file_type = analysis
            .modality
            .map(|m| m.as_str())
            .unwrap_or(UNKNOWN_FILE_TYPE);

        let record = NewAnalysisRecord {
            file_name: &analysis.file_name,
            file_type,
            sentiment_label: result.sentiment_label.as_str(),
            sentiment_score: result.sentiment_score as i32,
            authenticity_label: result.authenticity_label.as_str(),
            authenticity_score: result.authenticity_score as i32,
            reasoning: &result.reasoning,
            checks_json: &checks_json,
            details_json: &details_json,
            analyzed_at: &now,
            schema_version: &CURRENT_SCHEMA.version_string(),
        };

        diesel::insert_into(analysis_results::table)
            .values(&record)
            .execute(&mut conn)?;

        let id: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("last_insert_rowid()"))
            .first(&mut conn)?;

        info!(id, file = %analysis.file_name, label = %result.authenticity_label, "stored result");
        Ok(id)
    }

    pub fn get_result(&self, id: i32) -> Result<Option<StoredAnalysis>> {
        let mut conn = self.get_conn()?;
        let record = analysis_results::table
            .find(id)
            .first::<StoredAnalysis>(&mut conn)
            .optional()?;
        Ok(record)
    }

    /// Newest first
    pub fn list_results(&self, limit: Option<i64>) -> Result<Vec<StoredAnalysis>> {
        let mut conn = self.get_conn()?;

        let results = match limit {
            Some(n) => analysis_results::table
                .order(analysis_results::id.desc())
                .limit(n)
                .load::<StoredAnalysis>(&mut conn)?,
            None => analysis_results::table
                .order(analysis_results::id.desc())
                .load::<StoredAnalysis>(&mut conn)?,
        };

        Ok(results)
    }

    /// Returns false when no row had that id
    pub fn delete_result(&self, id: i32) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let deleted = diesel::delete(analysis_results::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    /// Get summary statistics
    pub fn get_summary(&self) -> Result<DbSummary> {
        let mut conn = self.get_conn()?;

        let total: i64 = analysis_results::table
            .count()
            .get_result(&mut conn)?;

        let count_label = |conn: &mut DbConn, label: AuthenticityLabel| -> Result<i64> {
            let n = analysis_results::table
                .filter(analysis_results::authenticity_label.eq(label.as_str()))
                .count()
                .get_result(conn)?;
            Ok(n)
        };

        let organic_count = count_label(&mut conn, AuthenticityLabel::LikelyOrganic)?;
        let inconclusive_count = count_label(&mut conn, AuthenticityLabel::Inconclusive)?;
        let synthetic_count = count_label(&mut conn, AuthenticityLabel::LikelySynthetic)?;
        let error_count = count_label(&mut conn, AuthenticityLabel::Error)?;

        // Use raw SQL for avg since Diesel's avg returns Numeric type
        let avg_score: Option<f64> = diesel::sql_query(
            "SELECT AVG(authenticity_score) as avg FROM analysis_results WHERE authenticity_label != 'Error'",
        )
        .get_result::<AvgResult>(&mut conn)?
        .avg;

        Ok(DbSummary {
            total: total as i32,
            organic_count: organic_count as i32,
            inconclusive_count: inconclusive_count as i32,
            synthetic_count: synthetic_count as i32,
            error_count: error_count as i32,
            avg_score,
        })
    }

    /// Clear all analysis records
    pub fn clear(&self) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let count = diesel::delete(analysis_results::table).execute(&mut conn)?;
        Ok(count)
    }
}

// ============================================================================
// Additional Types
// ============================================================================

/// Summary statistics from the database
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DbSummary {
    pub total: i32,
    pub organic_count: i32,
    pub inconclusive_count: i32,
    pub synthetic_count: i32,
    pub error_count: i32,
    /// Mean trust score, ignoring failed analyses
    pub avg_score: Option<f64>,
}
