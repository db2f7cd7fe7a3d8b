use thiserror::Error; // For domain-specific errors

// Module declarations
pub mod collection;
pub mod entities;
pub mod ids;
pub mod listing;
pub mod record;

// Re-export the types every layer uses
pub use collection::Collection;
pub use entities::{
    Appointment, AppointmentStatus, ContactMessage, Doctor, Entity, Patient, Priority,
    RecordStatus, Weekday,
};
pub use ids::{contact_message_id, next_sequential_id};
pub use listing::{
    AgeBand, AppointmentWindow, DEFAULT_PAGE_SIZE, PageInfo, Pagination, calculate_age, iso_date,
    sort_appointments,
};
pub use record::{Record, RecordId};

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid {collection} record: {reason}")]
    InvalidRecord { collection: String, reason: String },
    #[error("Invalid field value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },
    #[error("Field '{field}' is not part of a {collection} record")]
    UnknownField { collection: String, field: String },
    #[error("Missing required field '{0}'")]
    MissingField(String),
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}
