use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::RecordId;

/// Next id under the "count plus one unless taken" policy.
///
/// Starts from `existing.len() + 1` and walks forward past ids already in use. Gaps left
/// by deletions are never reused: with `P001` and `P003` present the result is `P004`.
pub fn next_sequential_id<S: AsRef<str>>(prefix: char, existing: &[S]) -> RecordId {
    let taken: HashSet<&str> = existing.iter().map(AsRef::as_ref).collect();
    let mut counter = existing.len() + 1;
    loop {
        let candidate = format!("{}{:03}", prefix, counter);
        if !taken.contains(candidate.as_str()) {
            return RecordId::new(candidate);
        }
        counter += 1;
    }
}

/// Contact submissions are keyed by their submission instant in milliseconds. When that
/// id is already in use the next free millisecond is taken.
pub fn contact_message_id<S: AsRef<str>>(now: DateTime<Utc>, existing: &[S]) -> RecordId {
    let taken: HashSet<&str> = existing.iter().map(AsRef::as_ref).collect();
    let mut millis = now.timestamp_millis();
    loop {
        let candidate = format!("C{}", millis);
        if !taken.contains(candidate.as_str()) {
            return RecordId::new(candidate);
        }
        millis += 1;
    }
}
