use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use domain::{AgeBand, AppointmentWindow, Collection, DomainError, PageInfo, Record, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

// Module declarations
pub mod registry;
pub mod seed;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the services
pub use registry::RegistryService;
pub use seed::{SeedReport, seed_sample_data};
pub use stats::{AppointmentStats, DashboardStats, DoctorStats, PatientStats, StatsService};
pub use store::RecordStore;

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Record '{id}' not found in {collection}")]
    NotFound { collection: Collection, id: String },
    #[error("Record '{id}' already exists in {collection}")]
    AlreadyExists { collection: Collection, id: String },
    #[error("Referenced {collection} record '{id}' does not exist")]
    MissingReference { collection: Collection, id: String },
    #[error("Storage failed for blob '{key}': {source}")]
    Storage {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Could not (de)serialize the {collection} collection: {source}")]
    Serialization {
        collection: Collection,
        source: serde_json::Error,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
}

impl ApplicationError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        ApplicationError::NotFound {
            collection,
            id: id.into(),
        }
    }
}

// --- Infrastructure Interfaces (Traits) ---

/// Key-value persistence primitive: one serialized blob per key.
///
/// `write` replaces the whole blob; implementations must leave the previous blob intact
/// when a write fails.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads a blob. `None` when the key was never written.
    async fn read(&self, key: &str) -> Result<Option<String>, ApplicationError>;
    /// Replaces the blob stored under `key`.
    async fn write(&self, key: &str, blob: String) -> Result<(), ApplicationError>;
    /// Whether `key` has ever been written.
    #[instrument(skip(self))]
    async fn contains(&self, key: &str) -> Result<bool, ApplicationError> {
        debug!(key = %key, "Checking blob existence via default read");
        Ok(self.read(key).await?.is_some())
    }
}

/// Source of the current instant. "Today" is always the UTC date.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant. Used for seeding fixtures and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Timestamp format written into `createdAt`, `lastUpdated` and `submittedAt`.
pub fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Filters and paging for a registry listing. Filters that do not apply to the listed
/// collection are rejected. Parameter names are camelCase like the stored fields
/// (`ageBand`, `patientId`, `doctorId`, `perPage`).
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Free-text search over the collection's search fields. Blank means "no search".
    #[serde(default)]
    pub query: Option<String>,
    pub status: Option<String>,
    /// Patients only.
    pub age_band: Option<AgeBand>,
    /// Doctors only.
    pub specialty: Option<String>,
    /// Appointments only.
    pub window: Option<AppointmentWindow>,
    /// Appointments only, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Appointments only.
    pub patient_id: Option<String>,
    /// Appointments only.
    pub doctor_id: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize, Debug)]
pub struct ListResponse {
    pub collection: Collection,
    /// Records on the requested page.
    pub records: Vec<Record>,
    pub page_info: PageInfo,
    /// The search term that was applied, if any.
    pub query: Option<String>,
}

/// Raw store search: substring `term` over the named `fields`.
#[derive(Deserialize, Debug)]
pub struct StoreSearchRequest {
    pub term: String,
    pub fields: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct StoreSearchResponse {
    pub records: Vec<Record>,
    pub nb_hits: usize,
    pub term: String,
}

#[derive(Serialize, Debug)]
pub struct NextIdResponse {
    pub collection: Collection,
    pub id: RecordId,
}
