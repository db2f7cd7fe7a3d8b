use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use domain::{Collection, Record, iso_date};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{ApplicationError, Clock, RecordStore};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct PatientStats {
    pub total: usize,
    pub active: usize,
    /// Created on or after the first day of the current month.
    pub new_this_month: usize,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct DoctorStats {
    pub total: usize,
    pub active: usize,
    /// Distinct non-empty specialties.
    pub specialties: usize,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: usize,
    pub today: usize,
    /// Dated after today and at most seven days ahead.
    pub this_week: usize,
    /// Scheduled or confirmed.
    pub pending: usize,
    pub completed: usize,
}

/// Response for the /stats endpoint.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct DashboardStats {
    pub patients: PatientStats,
    pub doctors: DoctorStats,
    pub appointments: AppointmentStats,
    pub contact_messages: usize,
}

/// Dashboard counters, computed from the raw records on every call.
pub struct StatsService {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<DashboardStats, ApplicationError> {
        let today = self.clock.today();
        let patients = self.store.get_all(Collection::Patients).await?;
        let doctors = self.store.get_all(Collection::Doctors).await?;
        let appointments = self.store.get_all(Collection::Appointments).await?;
        let contact_messages = self.store.get_all(Collection::Contacts).await?.len();

        let stats = DashboardStats {
            patients: patient_stats(&patients, today),
            doctors: doctor_stats(&doctors),
            appointments: appointment_stats(&appointments, today),
            contact_messages,
        };
        info!(
            patients = stats.patients.total,
            doctors = stats.doctors.total,
            appointments = stats.appointments.total,
            "Dashboard statistics computed"
        );
        Ok(stats)
    }
}

fn has_status(record: &Record, status: &str) -> bool {
    record.get_str("status") == Some(status)
}

fn patient_stats(patients: &[Record], today: NaiveDate) -> PatientStats {
    let month_start = today.with_day(1).unwrap_or(today);
    let new_this_month = patients
        .iter()
        .filter_map(|patient| patient.get_str("createdAt"))
        .filter_map(|created| DateTime::parse_from_rfc3339(created).ok())
        .filter(|created| created.with_timezone(&Utc).date_naive() >= month_start)
        .count();

    PatientStats {
        total: patients.len(),
        active: patients.iter().filter(|p| has_status(p, "active")).count(),
        new_this_month,
    }
}

fn doctor_stats(doctors: &[Record]) -> DoctorStats {
    let specialties: HashSet<String> = doctors
        .iter()
        .map(|doctor| doctor.field_text("specialty"))
        .filter(|specialty| !specialty.is_empty())
        .collect();

    DoctorStats {
        total: doctors.len(),
        active: doctors.iter().filter(|d| has_status(d, "active")).count(),
        specialties: specialties.len(),
    }
}

fn appointment_stats(appointments: &[Record], today: NaiveDate) -> AppointmentStats {
    let today_iso = iso_date(today);
    let week_end = iso_date(today + Duration::days(7));
    let dates: Vec<String> = appointments.iter().map(|a| a.field_text("date")).collect();

    AppointmentStats {
        total: appointments.len(),
        today: dates.iter().filter(|date| **date == today_iso).count(),
        this_week: dates
            .iter()
            .filter(|date| **date > today_iso && **date <= week_end)
            .count(),
        pending: appointments
            .iter()
            .filter(|a| has_status(a, "scheduled") || has_status(a, "confirmed"))
            .count(),
        completed: appointments
            .iter()
            .filter(|a| has_status(a, "completed"))
            .count(),
    }
}
