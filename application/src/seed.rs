use chrono::{DateTime, Duration, Utc};
use domain::{Collection, Record, iso_date};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::{ApplicationError, RecordStore, timestamp};

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub patients: usize,
    pub doctors: usize,
    pub appointments: usize,
}

/// Loads demonstration records into every empty collection except contacts.
/// Appointments are dated today, tomorrow and a week from `now`.
#[instrument(skip(store))]
pub async fn seed_sample_data(
    store: &RecordStore,
    now: DateTime<Utc>,
) -> Result<SeedReport, ApplicationError> {
    let stamp = timestamp(now);
    let report = SeedReport {
        patients: seed_if_empty(store, Collection::Patients, sample_patients(&stamp)).await?,
        doctors: seed_if_empty(store, Collection::Doctors, sample_doctors(&stamp)).await?,
        appointments: seed_if_empty(
            store,
            Collection::Appointments,
            sample_appointments(now, &stamp),
        )
        .await?,
    };
    info!(?report, "Sample data seeding finished");
    Ok(report)
}

async fn seed_if_empty(
    store: &RecordStore,
    collection: Collection,
    samples: Vec<Value>,
) -> Result<usize, ApplicationError> {
    if !store.get_all(collection).await?.is_empty() {
        return Ok(0);
    }
    let count = samples.len();
    for sample in samples {
        store.add(collection, Record::try_from(sample)?).await?;
    }
    info!(collection = %collection, count, "Seeded sample records");
    Ok(count)
}

fn sample_patients(stamp: &str) -> Vec<Value> {
    vec![
        json!({
            "id": "P001",
            "firstName": "John",
            "lastName": "Smith",
            "dateOfBirth": "1985-03-15",
            "gender": "male",
            "phone": "+1-555-0101",
            "email": "john.smith@email.com",
            "address": "123 Main St, Health City, HC 12345",
            "status": "active",
            "bloodType": "A+",
            "allergies": "Pollen",
            "conditions": "Hypertension",
            "medications": "Lisinopril 10mg",
            "emergencyName": "Jane Smith",
            "emergencyRelationship": "Spouse",
            "emergencyPhone": "+1-555-0102",
            "emergencyEmail": "jane.smith@email.com",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "P002",
            "firstName": "Sarah",
            "lastName": "Johnson",
            "dateOfBirth": "1990-07-22",
            "gender": "female",
            "phone": "+1-555-0103",
            "email": "sarah.johnson@email.com",
            "address": "456 Oak Ave, Health City, HC 12345",
            "status": "active",
            "bloodType": "O+",
            "allergies": "",
            "conditions": "",
            "medications": "",
            "emergencyName": "Mike Johnson",
            "emergencyRelationship": "Father",
            "emergencyPhone": "+1-555-0104",
            "emergencyEmail": "mike.johnson@email.com",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "P003",
            "firstName": "Michael",
            "lastName": "Brown",
            "dateOfBirth": "1978-12-03",
            "gender": "male",
            "phone": "+1-555-0105",
            "email": "michael.brown@email.com",
            "address": "789 Pine St, Health City, HC 12345",
            "status": "inactive",
            "bloodType": "B+",
            "allergies": "Shellfish",
            "conditions": "Diabetes Type 2",
            "medications": "Metformin 500mg",
            "emergencyName": "Lisa Brown",
            "emergencyRelationship": "Wife",
            "emergencyPhone": "+1-555-0106",
            "emergencyEmail": "lisa.brown@email.com",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
    ]
}

fn sample_doctors(stamp: &str) -> Vec<Value> {
    vec![
        json!({
            "id": "D001",
            "firstName": "Dr. Emily",
            "lastName": "Davis",
            "dateOfBirth": "1980-05-10",
            "gender": "female",
            "phone": "+1-555-0201",
            "email": "emily.davis@hospital.com",
            "address": "321 Hospital Blvd, Health City, HC 12345",
            "status": "active",
            "specialty": "cardiology",
            "experience": 15,
            "licenseNumber": "MD12345",
            "qualification": "MD",
            "education": "Harvard Medical School, Johns Hopkins Residency",
            "certifications": "Board Certified Cardiologist",
            "biography": "Dr. Davis specializes in preventive cardiology and cardiac imaging.",
            "availableDays": ["monday", "tuesday", "wednesday", "thursday", "friday"],
            "startTime": "09:00",
            "endTime": "17:00",
            "consultationDuration": 30,
            "roomNumber": "Room 205",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "D002",
            "firstName": "Dr. James",
            "lastName": "Wilson",
            "dateOfBirth": "1975-09-18",
            "gender": "male",
            "phone": "+1-555-0202",
            "email": "james.wilson@hospital.com",
            "address": "654 Medical Dr, Health City, HC 12345",
            "status": "active",
            "specialty": "pediatrics",
            "experience": 20,
            "licenseNumber": "MD12346",
            "qualification": "MD",
            "education": "Yale Medical School, Children's Hospital Fellowship",
            "certifications": "Board Certified Pediatrician",
            "biography": "Dr. Wilson has been caring for children and families for over 20 years.",
            "availableDays": ["monday", "tuesday", "wednesday", "friday", "saturday"],
            "startTime": "08:30",
            "endTime": "16:30",
            "consultationDuration": 20,
            "roomNumber": "Room 102",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "D003",
            "firstName": "Dr. Maria",
            "lastName": "Garcia",
            "dateOfBirth": "1988-11-25",
            "gender": "female",
            "phone": "+1-555-0203",
            "email": "maria.garcia@hospital.com",
            "address": "987 Care Ln, Health City, HC 12345",
            "status": "active",
            "specialty": "internal",
            "experience": 8,
            "licenseNumber": "MD12347",
            "qualification": "MD",
            "education": "Stanford Medical School, Internal Medicine Residency",
            "certifications": "Board Certified Internist",
            "biography": "Dr. Garcia focuses on comprehensive adult healthcare and chronic disease management.",
            "availableDays": ["monday", "wednesday", "thursday", "friday"],
            "startTime": "10:00",
            "endTime": "18:00",
            "consultationDuration": 45,
            "roomNumber": "Room 301",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
    ]
}

fn sample_appointments(now: DateTime<Utc>, stamp: &str) -> Vec<Value> {
    let today = now.date_naive();
    let tomorrow = iso_date(today + Duration::days(1));
    let next_week = iso_date(today + Duration::days(7));
    vec![
        json!({
            "id": "A001",
            "patientId": "P001",
            "patientName": "John Smith",
            "doctorId": "D001",
            "doctorName": "Dr. Emily Davis",
            "date": iso_date(today),
            "time": "10:30",
            "type": "consultation",
            "duration": 30,
            "priority": "normal",
            "status": "scheduled",
            "reason": "Regular cardiac checkup",
            "notes": "Follow up on recent test results",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "A002",
            "patientId": "P002",
            "patientName": "Sarah Johnson",
            "doctorId": "D002",
            "doctorName": "Dr. James Wilson",
            "date": tomorrow,
            "time": "14:00",
            "type": "check-up",
            "duration": 20,
            "priority": "high",
            "status": "confirmed",
            "reason": "Annual physical examination",
            "notes": "Routine checkup, check vaccination status",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
        json!({
            "id": "A003",
            "patientId": "P003",
            "patientName": "Michael Brown",
            "doctorId": "D003",
            "doctorName": "Dr. Maria Garcia",
            "date": next_week,
            "time": "11:15",
            "type": "follow-up",
            "duration": 45,
            "priority": "normal",
            "status": "scheduled",
            "reason": "Diabetes management review",
            "notes": "Review blood sugar logs and adjust medication",
            "createdAt": stamp,
            "lastUpdated": stamp
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryBlobs;
    use chrono::TimeZone;
    use domain::{Appointment, Doctor, Entity, Patient};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn seeds_empty_collections_with_valid_entities() {
        let store = RecordStore::new(Arc::new(MemoryBlobs::default()));
        let report = seed_sample_data(&store, now()).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                patients: 3,
                doctors: 3,
                appointments: 3
            }
        );

        for record in store.get_all(Collection::Patients).await.unwrap() {
            Patient::from_record(record).unwrap();
        }
        for record in store.get_all(Collection::Doctors).await.unwrap() {
            Doctor::from_record(record).unwrap();
        }
        let dates: Vec<String> = store
            .get_all(Collection::Appointments)
            .await
            .unwrap()
            .into_iter()
            .map(|record| Appointment::from_record(record).unwrap().date.to_string())
            .collect();
        assert_eq!(dates, vec!["2026-10-16", "2026-10-17", "2026-10-23"]);
        assert!(store.get_all(Collection::Contacts).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leaves_populated_collections_alone() {
        let blobs = Arc::new(MemoryBlobs::default());
        blobs.put("patients", r#"[{"id":"P900","firstName":"Kept","lastName":"Record"}]"#);
        let store = RecordStore::new(blobs);

        let report = seed_sample_data(&store, now()).await.unwrap();

        assert_eq!(report.patients, 0);
        assert_eq!(report.doctors, 3);
        let patients = store.get_all(Collection::Patients).await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id(), Some("P900"));
    }
}
