//! Helpers for listing records: ages, appointment windows, ordering and pagination.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Record};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Age in whole years on `today`.
pub fn calculate_age(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// `YYYY-MM-DD`, the format appointment dates are stored in.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    #[serde(rename = "0-18")]
    Minor,
    #[serde(rename = "19-35")]
    YoungAdult,
    #[serde(rename = "36-50")]
    MiddleAged,
    #[serde(rename = "51+")]
    Senior,
}

impl AgeBand {
    pub fn contains(&self, age: i32) -> bool {
        match self {
            AgeBand::Minor => (0..=18).contains(&age),
            AgeBand::YoungAdult => (19..=35).contains(&age),
            AgeBand::MiddleAged => (36..=50).contains(&age),
            AgeBand::Senior => age >= 51,
        }
    }
}

/// Which appointments a listing shows relative to today.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentWindow {
    #[default]
    All,
    Today,
    Upcoming,
    Past,
}

impl AppointmentWindow {
    /// Compares the stored `YYYY-MM-DD` string against today's date.
    pub fn contains(&self, date: &str, today: NaiveDate) -> bool {
        let today = iso_date(today);
        match self {
            AppointmentWindow::All => true,
            AppointmentWindow::Today => date == today,
            AppointmentWindow::Upcoming => date > today.as_str(),
            AppointmentWindow::Past => date < today.as_str(),
        }
    }
}

/// Orders appointment records by date, then time. Stable for equal keys.
pub fn sort_appointments(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.field_text("date")
            .cmp(&b.field_text("date"))
            .then_with(|| a.field_text("time").cmp(&b.field_text("time")))
    });
}

// --- Pagination ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Page numbers are 1-based; page 0 is read as page 1. A zero page size is rejected.
    pub fn new(page: usize, per_page: usize) -> Result<Self, DomainError> {
        if per_page == 0 {
            return Err(DomainError::InvalidPagination(
                "per_page must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page: page.max(1),
            per_page,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Saturates instead of overflowing, so absurd page numbers just yield empty pages.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Cuts the requested page out of `items`. Pages past the end are empty but still
    /// report accurate totals.
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, PageInfo) {
        let total_items = items.len();
        let total_pages = total_items.div_ceil(self.per_page);
        let offset = self.offset();
        let page_items: Vec<T> = items.into_iter().skip(offset).take(self.per_page).collect();

        let (showing_from, showing_to) = if page_items.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + page_items.len())
        };

        let info = PageInfo {
            page: self.page,
            per_page: self.per_page,
            total_items,
            total_pages,
            showing_from,
            showing_to,
            has_previous: self.page > 1,
            has_next: self.page < total_pages,
        };
        (page_items, info)
    }
}

/// Position of a page within a listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// 1-based index of the first item shown, 0 when the page is empty.
    pub showing_from: usize,
    pub showing_to: usize,
    pub has_previous: bool,
    pub has_next: bool,
}
