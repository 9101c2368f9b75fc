use chrono::{NaiveDate, Utc};

/// Our election IDs are auto-incremented integers.
pub type ElectionId = u32;

/// The current calendar date, which all election windows are measured against.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
