use time::{Date, Month, OffsetDateTime};

use crate::error::FarmacoError;

/// Today's calendar date in the local timezone, falling back to UTC when the
/// local offset cannot be determined.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// `YYYY-MM-DD`, used in export file names.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// `DD/MM/YYYY` with leading zeros, used for the issuance line.
pub fn italian_date(date: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

pub fn parse_iso_date(value: &str) -> Result<Date, FarmacoError> {
    let v = value.trim();
    let invalid = || FarmacoError::InvalidArgument("--issued-on must be in YYYY-MM-DD format".into());

    let bytes = v.as_bytes();
    if !v.is_ascii() || v.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid());
    }
    if !v
        .chars()
        .enumerate()
        .all(|(i, c)| (i == 4 || i == 7) || c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let year: i32 = v[0..4].parse().map_err(|_| invalid())?;
    let month: u8 = v[5..7].parse().map_err(|_| invalid())?;
    let day: u8 = v[8..10].parse().map_err(|_| invalid())?;

    let month = Month::try_from(month).map_err(|_| {
        FarmacoError::InvalidArgument(format!(
            "Invalid month {month} in --issued-on (must be 01-12)"
        ))
    })?;
    Date::from_calendar_date(year, month, day).map_err(|_| {
        FarmacoError::InvalidArgument(format!(
            "Invalid day {day} for month {} in --issued-on",
            u8::from(month)
        ))
    })
}
