use chrono::{Local, NaiveDate};

/// Comment dates are stored as plain text in this format.
pub const FORMAT: &str = "%Y-%m-%d";

pub fn format(date: NaiveDate) -> String {
    date.format(FORMAT).to_string()
}

/// Today's date in the server's timezone.
pub fn today() -> String {
    format(Local::now().naive_local().date())
}
