use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    Appointment, Collection, ContactMessage, Doctor, DomainError, Entity, Pagination, Patient,
    Record, RecordId, calculate_age, contact_message_id, next_sequential_id, sort_appointments,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{ApplicationError, Clock, ListQuery, ListResponse, RecordStore, timestamp};

/// Record lifecycle as the clinic screens drive it: id generation, timestamps, field
/// validation, appointment references, and filtered, paginated listings.
///
/// Everything here sits on top of [`RecordStore`]; the store itself stays permissive.
pub struct RegistryService {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl RegistryService {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>, page_size: usize) -> Self {
        Self {
            store,
            clock,
            page_size,
        }
    }

    /// The id the next created record would get.
    #[instrument(skip(self))]
    pub async fn next_id(&self, collection: Collection) -> Result<RecordId, ApplicationError> {
        let records = self.store.get_all(collection).await?;
        Ok(generate_id(collection, self.clock.now(), &records))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, collection: Collection, id: &str) -> Result<Record, ApplicationError> {
        self.store
            .get_by_id(collection, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(collection, id))
    }

    /// Validates and stores a new record. A missing `id` is generated; timestamps are
    /// always stamped here, whatever the payload carried. Id assignment and the
    /// duplicate check run under the store's write lock.
    #[instrument(skip(self, payload), fields(collection = %collection))]
    pub async fn create(
        &self,
        collection: Collection,
        payload: Record,
    ) -> Result<Record, ApplicationError> {
        info!("Attempting to create record");
        check_known_fields(collection, &payload)?;

        let now = self.clock.now();
        let stamp = timestamp(now);
        let mut record = payload;
        if collection == Collection::Contacts {
            record.insert("submittedAt", stamp);
        } else {
            record.insert("createdAt", stamp.clone());
            record.insert("lastUpdated", stamp);
        }

        if collection == Collection::Appointments {
            let (patient_name, doctor_name) = self.referenced_names(&record).await?;
            record.insert("patientName", patient_name);
            record.insert("doctorName", doctor_name);
        }

        let stored = self
            .store
            .add_with(collection, move |existing| {
                let mut record = record;
                match record.id().map(str::to_string) {
                    Some(id) => {
                        if existing.iter().any(|other| other.has_id(&id)) {
                            warn!(record_id = %id, "Creation failed: id already in use");
                            return Err(ApplicationError::AlreadyExists { collection, id });
                        }
                    }
                    None => {
                        let id = generate_id(collection, now, existing);
                        debug!(record_id = %id, "Generated record id");
                        record.insert("id", id.as_str());
                    }
                }
                Ok(normalize(collection, record)?)
            })
            .await?;
        info!(record_id = stored.id().unwrap_or_default(), "Record created");
        Ok(stored)
    }

    /// Applies a partial update. Field names are checked against the entity's field
    /// table and the merged result must still be a valid entity; only the patched
    /// fields (plus `lastUpdated` and re-copied names) reach the store. Validation runs
    /// against the stored record under the store's write lock.
    #[instrument(skip(self, patch), fields(collection = %collection))]
    pub async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Record,
    ) -> Result<Record, ApplicationError> {
        info!("Attempting to update record");
        check_known_fields(collection, &patch)?;
        if let Some(patched_id) = patch.get("id") {
            if patched_id.as_str() != Some(id) {
                warn!(record_id = %id, "Update rejected: id change requested");
                return Err(ApplicationError::InvalidInput(format!(
                    "The id of record '{}' cannot be changed",
                    id
                )));
            }
        }

        let mut patch = patch;
        if collection != Collection::Contacts {
            patch.insert("lastUpdated", timestamp(self.clock.now()));
        }
        if collection == Collection::Appointments {
            if patch.contains_field("patientId") {
                let patient = self
                    .referenced(&patch, "patientId", Collection::Patients)
                    .await?;
                patch.insert("patientName", display_name(&patient));
            }
            if patch.contains_field("doctorId") {
                let doctor = self
                    .referenced(&patch, "doctorId", Collection::Doctors)
                    .await?;
                patch.insert("doctorName", display_name(&doctor));
            }
        }

        let updated = self
            .store
            .update_with(collection, id, move |existing| {
                let mut preview = existing.clone();
                preview.merge(patch.clone());
                // Numbers sent as text come back as numbers; dropped values become null.
                let normalized = normalize(collection, preview)?;
                Ok(patch
                    .field_names()
                    .map(|name| {
                        let value = normalized.get(name).cloned().unwrap_or(Value::Null);
                        (name.to_string(), value)
                    })
                    .collect())
            })
            .await?
            .ok_or_else(|| {
                warn!(record_id = %id, "Update failed: record not found");
                ApplicationError::not_found(collection, id)
            })?;
        info!(record_id = %id, "Record updated");
        Ok(updated)
    }

    /// Deletes a record. Appointments referencing a deleted patient or doctor are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<(), ApplicationError> {
        if self.store.delete(collection, id).await? {
            info!(collection = %collection, record_id = %id, "Record deleted");
            Ok(())
        } else {
            warn!(collection = %collection, record_id = %id, "Deletion failed: record not found");
            Err(ApplicationError::not_found(collection, id))
        }
    }

    /// Search (when the query is not blank), then collection filters, then paging.
    /// Appointments are always ordered by date and time.
    #[instrument(skip(self, query), fields(collection = %collection, query = ?query.query))]
    pub async fn list(
        &self,
        collection: Collection,
        query: ListQuery,
    ) -> Result<ListResponse, ApplicationError> {
        check_filters_apply(collection, &query)?;
        let pagination = Pagination::new(
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(self.page_size),
        )?;

        let term = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);
        let mut records = match &term {
            Some(term) => {
                self.store
                    .search(collection, term, collection.search_fields())
                    .await?
            }
            None => self.store.get_all(collection).await?,
        };

        let today = self.clock.today();
        records.retain(|record| matches_filters(&query, record, today));
        if collection == Collection::Appointments {
            sort_appointments(&mut records);
        }

        let (records, page_info) = pagination.paginate(records);
        debug!(
            total = page_info.total_items,
            returned = records.len(),
            "Listing assembled"
        );
        Ok(ListResponse {
            collection,
            records,
            page_info,
            query: term,
        })
    }

    /// Display names copied onto an appointment from the records it references.
    async fn referenced_names(
        &self,
        appointment: &Record,
    ) -> Result<(String, String), ApplicationError> {
        let patient = self
            .referenced(appointment, "patientId", Collection::Patients)
            .await?;
        let doctor = self
            .referenced(appointment, "doctorId", Collection::Doctors)
            .await?;
        Ok((display_name(&patient), display_name(&doctor)))
    }

    async fn referenced(
        &self,
        appointment: &Record,
        field: &str,
        collection: Collection,
    ) -> Result<Record, ApplicationError> {
        let id = appointment
            .get_str(field)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DomainError::MissingField(field.to_string()))?;
        self.store
            .get_by_id(collection, id)
            .await?
            .ok_or_else(|| {
                warn!(collection = %collection, record_id = %id, "Appointment references a missing record");
                ApplicationError::MissingReference {
                    collection,
                    id: id.to_string(),
                }
            })
    }
}

/// Sequential ids for patients, doctors and appointments; millisecond ids for contacts.
fn generate_id(collection: Collection, now: DateTime<Utc>, records: &[Record]) -> RecordId {
    let existing: Vec<&str> = records
        .iter()
        .map(|record| record.id().unwrap_or_default())
        .collect();
    match collection {
        Collection::Contacts => contact_message_id(now, &existing),
        _ => next_sequential_id(collection.id_prefix(), &existing),
    }
}

fn display_name(record: &Record) -> String {
    format!(
        "{} {}",
        record.field_text("firstName"),
        record.field_text("lastName")
    )
}

/// Rejects field names outside the entity's declared field table.
fn check_known_fields(collection: Collection, record: &Record) -> Result<(), DomainError> {
    let table = collection.field_table();
    match record.field_names().find(|name| !table.contains(name)) {
        Some(unknown) => Err(DomainError::UnknownField {
            collection: collection.to_string(),
            field: unknown.to_string(),
        }),
        None => Ok(()),
    }
}

/// Round-trips a record through its typed entity so only valid shapes are stored.
fn normalize(collection: Collection, record: Record) -> Result<Record, DomainError> {
    match collection {
        Collection::Patients => Patient::from_record(record)?.to_record(),
        Collection::Doctors => Doctor::from_record(record)?.to_record(),
        Collection::Appointments => Appointment::from_record(record)?.to_record(),
        Collection::Contacts => ContactMessage::from_record(record)?.to_record(),
    }
}

fn check_filters_apply(collection: Collection, query: &ListQuery) -> Result<(), ApplicationError> {
    let misplaced = match collection {
        Collection::Patients => first_set(&[
            ("specialty", query.specialty.is_some()),
            ("window", query.window.is_some()),
            ("date", query.date.is_some()),
            ("patientId", query.patient_id.is_some()),
            ("doctorId", query.doctor_id.is_some()),
        ]),
        Collection::Doctors => first_set(&[
            ("ageBand", query.age_band.is_some()),
            ("window", query.window.is_some()),
            ("date", query.date.is_some()),
            ("patientId", query.patient_id.is_some()),
            ("doctorId", query.doctor_id.is_some()),
        ]),
        Collection::Appointments => first_set(&[
            ("ageBand", query.age_band.is_some()),
            ("specialty", query.specialty.is_some()),
        ]),
        Collection::Contacts => first_set(&[
            ("status", query.status.is_some()),
            ("ageBand", query.age_band.is_some()),
            ("specialty", query.specialty.is_some()),
            ("window", query.window.is_some()),
            ("date", query.date.is_some()),
            ("patientId", query.patient_id.is_some()),
            ("doctorId", query.doctor_id.is_some()),
        ]),
    };
    match misplaced {
        Some(filter) => Err(ApplicationError::InvalidInput(format!(
            "Filter '{}' does not apply to {}",
            filter, collection
        ))),
        None => Ok(()),
    }
}

fn first_set(filters: &[(&'static str, bool)]) -> Option<&'static str> {
    filters.iter().find(|(_, set)| *set).map(|(name, _)| *name)
}

fn matches_filters(query: &ListQuery, record: &Record, today: NaiveDate) -> bool {
    let field_equals = |field: &str, expected: &Option<String>| {
        expected
            .as_deref()
            .is_none_or(|expected| record.field_text(field) == expected)
    };

    let age_matches = query.age_band.is_none_or(|band| {
        record
            .get_str("dateOfBirth")
            .and_then(|dob| NaiveDate::parse_from_str(dob, "%Y-%m-%d").ok())
            .is_some_and(|dob| band.contains(calculate_age(dob, today)))
    });
    let window_matches = query
        .window
        .is_none_or(|window| window.contains(&record.field_text("date"), today));

    field_equals("status", &query.status)
        && field_equals("specialty", &query.specialty)
        && field_equals("date", &query.date)
        && field_equals("patientId", &query.patient_id)
        && field_equals("doctorId", &query.doctor_id)
        && age_matches
        && window_matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;
    use crate::seed::seed_sample_data;
    use crate::test_support::MemoryBlobs;
    use chrono::{TimeZone, Utc};
    use domain::{AgeBand, AppointmentWindow};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::try_from(value).expect("test fixture must be an object")
    }

    async fn seeded_registry() -> (RegistryService, Arc<RecordStore>) {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let store = Arc::new(RecordStore::new(Arc::new(MemoryBlobs::default())));
        seed_sample_data(&store, now).await.unwrap();
        let registry = RegistryService::new(store.clone(), Arc::new(FixedClock(now)), 10);
        (registry, store)
    }

    #[tokio::test]
    async fn next_id_follows_the_sequential_policy() {
        let (registry, _) = seeded_registry().await;
        assert_eq!(registry.next_id(Collection::Patients).await.unwrap().as_str(), "P004");

        registry.delete(Collection::Patients, "P002").await.unwrap();
        // Two ids left, count+1 = P003 is taken, so P004 again; P002 is not reused.
        assert_eq!(registry.next_id(Collection::Patients).await.unwrap().as_str(), "P004");
        assert!(registry.next_id(Collection::Contacts).await.unwrap().as_str().starts_with('C'));
    }

    #[tokio::test]
    async fn create_generates_id_and_timestamps() {
        let (registry, _) = seeded_registry().await;
        let created = registry
            .create(
                Collection::Patients,
                record(json!({ "firstName": "Ada", "lastName": "Lovelace", "status": "active" })),
            )
            .await
            .unwrap();

        assert_eq!(created.id(), Some("P004"));
        assert!(created.get_str("createdAt").is_some());
        assert_eq!(created.get("createdAt"), created.get("lastUpdated"));
        assert_eq!(created.get_str("bloodType"), Some(""));
    }

    #[tokio::test]
    async fn create_rejects_unknown_fields_and_taken_ids() {
        let (registry, _) = seeded_registry().await;
        let stray = registry
            .create(
                Collection::Patients,
                record(json!({ "firstName": "Ada", "lastName": "L", "favouriteColour": "red" })),
            )
            .await;
        assert!(matches!(
            stray,
            Err(ApplicationError::DomainError(DomainError::UnknownField { field, .. })) if field == "favouriteColour"
        ));

        let taken = registry
            .create(
                Collection::Patients,
                record(json!({ "id": "P001", "firstName": "Ada", "lastName": "L" })),
            )
            .await;
        assert!(matches!(taken, Err(ApplicationError::AlreadyExists { id, .. }) if id == "P001"));
    }

    #[tokio::test]
    async fn appointment_creation_copies_names_and_checks_references() {
        let (registry, _) = seeded_registry().await;
        let created = registry
            .create(
                Collection::Appointments,
                record(json!({
                    "patientId": "P002",
                    "doctorId": "D003",
                    "date": "2026-10-20",
                    "time": "09:15",
                    "type": "consultation",
                    "duration": "30",
                    "priority": "high",
                    "status": "scheduled"
                })),
            )
            .await
            .unwrap();
        assert_eq!(created.id(), Some("A004"));
        assert_eq!(created.get_str("patientName"), Some("Sarah Johnson"));
        assert_eq!(created.get_str("doctorName"), Some("Dr. Maria Garcia"));
        assert_eq!(created.get("duration"), Some(&json!(30)));

        let dangling = registry
            .create(
                Collection::Appointments,
                record(json!({
                    "patientId": "P404",
                    "doctorId": "D001",
                    "date": "2026-10-20",
                    "time": "09:15"
                })),
            )
            .await;
        assert!(matches!(
            dangling,
            Err(ApplicationError::MissingReference { collection: Collection::Patients, id }) if id == "P404"
        ));
    }

    #[tokio::test]
    async fn update_merges_and_restamps() {
        let (registry, _) = seeded_registry().await;
        let before = registry.get(Collection::Doctors, "D002").await.unwrap();

        let updated = registry
            .update(
                Collection::Doctors,
                "D002",
                record(json!({ "experience": "21", "roomNumber": "Room 104" })),
            )
            .await
            .unwrap();

        assert_eq!(updated.get("experience"), Some(&json!(21)));
        assert_eq!(updated.get_str("roomNumber"), Some("Room 104"));
        assert_eq!(updated.get("specialty"), before.get("specialty"));
        assert_eq!(updated.get("createdAt"), before.get("createdAt"));
    }

    #[tokio::test]
    async fn update_recopies_names_when_references_change() {
        let (registry, _) = seeded_registry().await;
        let updated = registry
            .update(Collection::Appointments, "A001", record(json!({ "doctorId": "D002" })))
            .await
            .unwrap();
        assert_eq!(updated.get_str("doctorName"), Some("Dr. James Wilson"));
        assert_eq!(updated.get_str("patientName"), Some("John Smith"));
    }

    #[tokio::test]
    async fn update_rejects_id_changes_invalid_values_and_missing_records() {
        let (registry, store) = seeded_registry().await;

        let renamed = registry
            .update(Collection::Patients, "P001", record(json!({ "id": "P100" })))
            .await;
        assert!(matches!(renamed, Err(ApplicationError::InvalidInput(_))));

        let invalid = registry
            .update(Collection::Patients, "P001", record(json!({ "status": "archived" })))
            .await;
        assert!(matches!(
            invalid,
            Err(ApplicationError::DomainError(DomainError::InvalidRecord { .. }))
        ));
        let untouched = store.get_by_id(Collection::Patients, "P001").await.unwrap().unwrap();
        assert_eq!(untouched.get_str("status"), Some("active"));

        let missing = registry
            .update(Collection::Patients, "P404", record(json!({ "phone": "1" })))
            .await;
        assert!(matches!(missing, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn deleting_a_patient_keeps_its_appointments() {
        let (registry, _) = seeded_registry().await;
        registry.delete(Collection::Patients, "P001").await.unwrap();
        let appointment = registry.get(Collection::Appointments, "A001").await.unwrap();
        assert_eq!(appointment.get_str("patientId"), Some("P001"));

        let again = registry.delete(Collection::Patients, "P001").await;
        assert!(matches!(again, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn patient_listing_searches_then_filters() {
        let (registry, _) = seeded_registry().await;

        let by_name = registry
            .list(
                Collection::Patients,
                ListQuery {
                    query: Some("  SARAH ".to_string()),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_name.records.len(), 1);
        assert_eq!(by_name.query.as_deref(), Some("SARAH"));

        let inactive = registry
            .list(
                Collection::Patients,
                ListQuery {
                    status: Some("inactive".to_string()),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        let ids: Vec<&str> = inactive.records.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["P003"]);

        registry
            .create(
                Collection::Patients,
                record(json!({ "firstName": "Tom", "lastName": "Young", "dateOfBirth": "2010-11-01" })),
            )
            .await
            .unwrap();
        // Born 2010-11-01, still 15 on 2026-10-16; every sample patient is over 35.
        let minors = registry
            .list(
                Collection::Patients,
                ListQuery {
                    age_band: Some(AgeBand::Minor),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        let ids: Vec<&str> = minors.records.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["P004"]);
    }

    #[tokio::test]
    async fn appointment_listing_filters_by_window_and_sorts() {
        let (registry, _) = seeded_registry().await;

        let today = registry
            .list(
                Collection::Appointments,
                ListQuery {
                    window: Some(AppointmentWindow::Today),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        let ids: Vec<&str> = today.records.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["A001"]);

        let upcoming = registry
            .list(
                Collection::Appointments,
                ListQuery {
                    window: Some(AppointmentWindow::Upcoming),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        let ids: Vec<&str> = upcoming.records.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["A002", "A003"]);
    }

    #[tokio::test]
    async fn listing_paginates_and_rejects_foreign_filters() {
        let (registry, _) = seeded_registry().await;

        let page = registry
            .list(
                Collection::Doctors,
                ListQuery {
                    page: Some(2),
                    per_page: Some(2),
                    ..ListQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.page_info.total_pages, 2);
        assert_eq!(page.page_info.showing_from, 3);

        let foreign = registry
            .list(
                Collection::Doctors,
                ListQuery {
                    age_band: Some(AgeBand::Senior),
                    ..ListQuery::default()
                },
            )
            .await;
        assert!(matches!(foreign, Err(ApplicationError::InvalidInput(msg)) if msg.contains("ageBand")));
    }

    #[tokio::test]
    async fn contact_messages_get_timestamp_ids() {
        let (registry, _) = seeded_registry().await;
        let created = registry
            .create(
                Collection::Contacts,
                record(json!({
                    "name": "Visitor",
                    "email": "visitor@example.com",
                    "subject": "Opening hours",
                    "message": "Are you open on Sundays?"
                })),
            )
            .await
            .unwrap();
        assert_eq!(created.id(), Some("C1792141200000"));
        assert!(created.get_str("submittedAt").is_some());
        assert!(!created.contains_field("createdAt"));

        let same_instant = registry
            .create(
                Collection::Contacts,
                record(json!({ "name": "Second", "message": "Same millisecond" })),
            )
            .await
            .unwrap();
        assert_eq!(same_instant.id(), Some("C1792141200001"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_ids() {
        let (registry, store) = seeded_registry().await;
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .create(
                            Collection::Patients,
                            record(json!({ "firstName": format!("Patient{n}"), "lastName": "Concurrent" })),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids: Vec<String> = store
            .get_all(Collection::Patients)
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.id().map(str::to_string))
            .collect();
        ids.sort();
        let expected: Vec<String> = (1..=11).map(|n| format!("P{:03}", n)).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_one_id_admit_a_single_winner() {
        let (registry, store) = seeded_registry().await;
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .create(
                            Collection::Doctors,
                            record(json!({ "id": "D100", "firstName": "Dr. Same", "lastName": "Id" })),
                        )
                        .await
                })
            })
            .collect();
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, ApplicationError::AlreadyExists { .. })),
            }
        }

        assert_eq!(created, 1);
        let copies = store
            .get_all(Collection::Doctors)
            .await
            .unwrap()
            .iter()
            .filter(|r| r.has_id("D100"))
            .count();
        assert_eq!(copies, 1);
    }
}
