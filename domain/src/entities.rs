//! Typed views of the records kept in each collection.
//!
//! The store itself is type-erased; these structs are used at the registry boundary to
//! validate payloads and to compute things like ages and denormalized names. Field names
//! serialize in camelCase so a typed entity converts into exactly the stored layout.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::listing::calculate_age;
use crate::{Collection, DomainError, Record, RecordId};

/// A record shape bound to one collection.
pub trait Entity: Serialize + DeserializeOwned {
    const COLLECTION: Collection;
    /// Every field name this entity declares, in stored order.
    const FIELDS: &'static [&'static str];
    /// Fields matched by the free-text search of a listing.
    const SEARCH_FIELDS: &'static [&'static str];

    fn id(&self) -> &RecordId;

    /// Checks beyond what deserialization already enforces.
    fn validate(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn to_record(&self) -> Result<Record, DomainError> {
        let value = serde_json::to_value(self).map_err(|e| invalid_record::<Self>(e))?;
        Record::try_from(value)
    }

    fn from_record(record: Record) -> Result<Self, DomainError> {
        let entity: Self =
            serde_json::from_value(Value::from(record)).map_err(|e| invalid_record::<Self>(e))?;
        entity.validate()?;
        Ok(entity)
    }
}

fn invalid_record<E: Entity>(err: impl std::fmt::Display) -> DomainError {
    DomainError::InvalidRecord {
        collection: E::COLLECTION.to_string(),
        reason: err.to_string(),
    }
}

// --- Shared field types ---

/// Lifecycle status shared by patients and doctors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Scheduled or confirmed, i.e. still expected to happen.
    pub fn is_pending(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

// --- Patient ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub medications: String,
    #[serde(default)]
    pub emergency_name: String,
    #[serde(default)]
    pub emergency_relationship: String,
    #[serde(default)]
    pub emergency_phone: String,
    #[serde(default)]
    pub emergency_email: String,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self, today: NaiveDate) -> Option<i32> {
        self.date_of_birth.map(|dob| calculate_age(dob, today))
    }
}

impl Entity for Patient {
    const COLLECTION: Collection = Collection::Patients;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "firstName",
        "lastName",
        "dateOfBirth",
        "gender",
        "phone",
        "email",
        "address",
        "status",
        "bloodType",
        "allergies",
        "conditions",
        "medications",
        "emergencyName",
        "emergencyRelationship",
        "emergencyPhone",
        "emergencyEmail",
        "createdAt",
        "lastUpdated",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["firstName", "lastName", "id", "phone"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text("firstName", &self.first_name)?;
        require_text("lastName", &self.last_name)
    }
}

// --- Doctor ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub specialty: String,
    /// Years in practice.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub experience: u32,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub certifications: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub available_days: Vec<Weekday>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    /// Minutes per consultation.
    #[serde(
        default = "default_duration",
        deserialize_with = "lenient_u32"
    )]
    pub consultation_duration: u32,
    #[serde(default)]
    pub room_number: String,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_available_on(&self, day: Weekday) -> bool {
        self.available_days.contains(&day)
    }
}

impl Entity for Doctor {
    const COLLECTION: Collection = Collection::Doctors;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "firstName",
        "lastName",
        "dateOfBirth",
        "gender",
        "phone",
        "email",
        "address",
        "status",
        "specialty",
        "experience",
        "licenseNumber",
        "qualification",
        "education",
        "certifications",
        "biography",
        "availableDays",
        "startTime",
        "endTime",
        "consultationDuration",
        "roomNumber",
        "createdAt",
        "lastUpdated",
    ];
    const SEARCH_FIELDS: &'static [&'static str] =
        &["firstName", "lastName", "id", "specialty", "licenseNumber"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text("firstName", &self.first_name)?;
        require_text("lastName", &self.last_name)?;
        let start = optional_clock_time("startTime", &self.start_time)?;
        let end = optional_clock_time("endTime", &self.end_time)?;
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Err(DomainError::InvalidFieldValue {
                    field: "endTime".to_string(),
                    reason: format!("'{}' is not after startTime '{}'", self.end_time, self.start_time),
                });
            }
        }
        Ok(())
    }
}

// --- Appointment ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: RecordId,
    pub patient_id: RecordId,
    /// Copied from the patient at write time, never kept in sync.
    #[serde(default)]
    pub patient_name: String,
    pub doctor_id: RecordId,
    /// Copied from the doctor at write time, never kept in sync.
    #[serde(default)]
    pub doctor_name: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "type", default)]
    pub appointment_type: String,
    #[serde(default = "default_duration", deserialize_with = "lenient_u32")]
    pub duration: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: String,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for Appointment {
    const COLLECTION: Collection = Collection::Appointments;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "patientId",
        "patientName",
        "doctorId",
        "doctorName",
        "date",
        "time",
        "type",
        "duration",
        "priority",
        "status",
        "reason",
        "notes",
        "createdAt",
        "lastUpdated",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["patientName", "doctorName", "id", "reason"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        parse_clock_time("time", &self.time)?;
        if self.duration == 0 {
            return Err(DomainError::InvalidFieldValue {
                field: "duration".to_string(),
                reason: "must be at least one minute".to_string(),
            });
        }
        Ok(())
    }
}

// --- Contact message ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    #[serde(
        default,
        serialize_with = "millis_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Entity for ContactMessage {
    const COLLECTION: Collection = Collection::Contacts;
    const FIELDS: &'static [&'static str] =
        &["id", "name", "email", "phone", "subject", "message", "submittedAt"];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email", "subject"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text("name", &self.name)?;
        require_text("message", &self.message)
    }
}

// --- Field helpers ---

fn default_duration() -> u32 {
    30
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField(field.to_string()));
    }
    Ok(())
}

/// Parses an `HH:MM` wall-clock time.
pub fn parse_clock_time(field: &str, value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| DomainError::InvalidFieldValue {
        field: field.to_string(),
        reason: format!("Expected HH:MM, got '{}'", value),
    })
}

fn optional_clock_time(field: &str, value: &str) -> Result<Option<NaiveTime>, DomainError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_clock_time(field, value).map(Some)
}

/// Form submissions carry numbers as text; stored sample data carries them as integers.
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(number) => Ok(number),
        NumberOrText::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a whole number, got '{}'", text))),
    }
}

/// Timestamps are written with millisecond precision and a `Z` suffix.
fn millis_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(instant) => {
            serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        None => serializer.serialize_none(),
    }
}

/// Empty strings and nulls mean "not given".
fn optional_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected YYYY-MM-DD, got '{}'", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).expect("test fixture must be an object")
    }

    #[test]
    fn patient_parses_stored_layout() {
        let patient = Patient::from_record(record(json!({
            "id": "P001",
            "firstName": "John",
            "lastName": "Smith",
            "dateOfBirth": "1985-03-15",
            "status": "active",
            "bloodType": "A+",
            "createdAt": "2026-10-01T08:00:00.000Z"
        })))
        .unwrap();
        assert_eq!(patient.id.as_str(), "P001");
        assert_eq!(patient.full_name(), "John Smith");
        assert_eq!(
            patient.age(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()),
            Some(40)
        );
        assert_eq!(patient.blood_type, "A+");
        assert_eq!(patient.allergies, "");
        assert_eq!(
            patient.to_record().unwrap().get_str("createdAt"),
            Some("2026-10-01T08:00:00.000Z")
        );
    }

    #[test]
    fn patient_to_record_uses_camel_case_names() {
        let patient = Patient::from_record(record(json!({
            "id": "P009",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dateOfBirth": ""
        })))
        .unwrap();
        assert_eq!(patient.date_of_birth, None);

        let stored = patient.to_record().unwrap();
        assert_eq!(stored.get_str("firstName"), Some("Ada"));
        assert_eq!(stored.get_str("emergencyPhone"), Some(""));
        assert!(!stored.contains_field("dateOfBirth"));
        assert!(stored.field_names().all(|name| Patient::FIELDS.contains(&name)));
    }

    #[test]
    fn patient_requires_a_name() {
        let result = Patient::from_record(record(json!({
            "id": "P010",
            "firstName": " ",
            "lastName": "Nobody"
        })));
        assert!(matches!(result, Err(DomainError::MissingField(field)) if field == "firstName"));
    }

    #[test]
    fn doctor_accepts_numbers_sent_as_text() {
        let doctor = Doctor::from_record(record(json!({
            "id": "D004",
            "firstName": "Dr. Ana",
            "lastName": "Silva",
            "experience": "12",
            "consultationDuration": 20,
            "availableDays": ["monday", "thursday"],
            "startTime": "09:00",
            "endTime": "17:00"
        })))
        .unwrap();
        assert_eq!(doctor.experience, 12);
        assert_eq!(doctor.consultation_duration, 20);
        assert!(doctor.is_available_on(Weekday::Thursday));
        assert!(!doctor.is_available_on(Weekday::Sunday));
        assert_eq!(doctor.to_record().unwrap().get("experience"), Some(&json!(12)));
    }

    #[test]
    fn doctor_rejects_inverted_schedule() {
        let result = Doctor::from_record(record(json!({
            "id": "D005",
            "firstName": "Dr. Late",
            "lastName": "Shift",
            "startTime": "18:00",
            "endTime": "09:00"
        })));
        assert!(
            matches!(result, Err(DomainError::InvalidFieldValue { field, .. }) if field == "endTime")
        );
    }

    #[test]
    fn appointment_parses_type_and_status() {
        let appointment = Appointment::from_record(record(json!({
            "id": "A001",
            "patientId": "P001",
            "doctorId": "D001",
            "date": "2026-10-16",
            "time": "10:30",
            "type": "consultation",
            "duration": "45",
            "status": "no-show"
        })))
        .unwrap();
        assert_eq!(appointment.appointment_type, "consultation");
        assert_eq!(appointment.duration, 45);
        assert_eq!(appointment.status, AppointmentStatus::NoShow);
        assert!(!appointment.status.is_pending());
        assert_eq!(appointment.priority, Priority::Normal);
        let stored = appointment.to_record().unwrap();
        assert_eq!(stored.get_str("date"), Some("2026-10-16"));
        assert_eq!(stored.get_str("type"), Some("consultation"));
    }

    #[test]
    fn appointment_rejects_malformed_time() {
        let result = Appointment::from_record(record(json!({
            "id": "A002",
            "patientId": "P001",
            "doctorId": "D001",
            "date": "2026-10-16",
            "time": "half past ten"
        })));
        assert!(
            matches!(result, Err(DomainError::InvalidFieldValue { field, .. }) if field == "time")
        );
    }

    #[test]
    fn unknown_enum_values_are_invalid_records() {
        let result = Appointment::from_record(record(json!({
            "id": "A003",
            "patientId": "P001",
            "doctorId": "D001",
            "date": "2026-10-16",
            "time": "10:30",
            "status": "postponed"
        })));
        assert!(
            matches!(result, Err(DomainError::InvalidRecord { collection, .. }) if collection == "appointments")
        );
    }

    #[test]
    fn contact_message_requires_body() {
        let result = ContactMessage::from_record(record(json!({
            "id": "C1",
            "name": "Visitor",
            "email": "visitor@example.com",
            "message": ""
        })));
        assert!(matches!(result, Err(DomainError::MissingField(field)) if field == "message"));
    }
}
