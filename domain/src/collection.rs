use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;
use crate::entities::{Appointment, ContactMessage, Doctor, Entity, Patient};

/// One of the four named record sequences.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Patients,
    Doctors,
    Appointments,
    Contacts,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Patients,
        Collection::Doctors,
        Collection::Appointments,
        Collection::Contacts,
    ];

    /// The collection name, which is also the key of its persisted blob.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Doctors => "doctors",
            Collection::Appointments => "appointments",
            Collection::Contacts => "contacts",
        }
    }

    /// Letter prepended to generated ids (`P001`, `D001`, `A001`, `C1700000000000`).
    pub fn id_prefix(&self) -> char {
        match self {
            Collection::Patients => 'P',
            Collection::Doctors => 'D',
            Collection::Appointments => 'A',
            Collection::Contacts => 'C',
        }
    }

    /// Declared field names of the entity stored in this collection.
    pub fn field_table(&self) -> &'static [&'static str] {
        match self {
            Collection::Patients => Patient::FIELDS,
            Collection::Doctors => Doctor::FIELDS,
            Collection::Appointments => Appointment::FIELDS,
            Collection::Contacts => ContactMessage::FIELDS,
        }
    }

    /// Fields the listing search box looks at.
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Patients => Patient::SEARCH_FIELDS,
            Collection::Doctors => Doctor::SEARCH_FIELDS,
            Collection::Appointments => Appointment::SEARCH_FIELDS,
            Collection::Contacts => ContactMessage::SEARCH_FIELDS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.name() == s)
            .ok_or_else(|| DomainError::UnknownCollection(s.to_string()))
    }
}
