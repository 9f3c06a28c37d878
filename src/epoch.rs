//! Conversion between the cached time registers and Unix time.
//!
//! The registers are taken as UTC wall-clock time and the year register as
//! years since 2000. Calendar arithmetic is done with `chrono`; the
//! `datetime` types are only accepted and produced at the driver's edge.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use datetime::{DatePiece, LocalDate, LocalDateTime, LocalTime, Month, TimePiece};

use crate::snapshot::{SnapshotError, TimeField, TimeSnapshot};

/// 2000-01-01T00:00:00Z, the earliest instant the chip can hold.
pub const EPOCH_FLOOR: u32 = 946_684_800;

/// 2099-12-31T23:59:59Z, the latest instant the chip can hold.
pub const EPOCH_CEILING: u32 = 4_102_444_799;

/// Calendar date and time held in `snapshot`. Hours are taken raw, the
/// twelve-hour display setting plays no part.
pub fn to_naive_date_time(snapshot: &TimeSnapshot) -> Result<NaiveDateTime, SnapshotError> {
    NaiveDate::from_ymd_opt(
        snapshot.year() as i32,
        snapshot.decimal(TimeField::Month) as u32,
        snapshot.decimal(TimeField::Date) as u32,
    )
    .and_then(|date| {
        date.and_hms_opt(
            snapshot.decimal(TimeField::Hours) as u32,
            snapshot.decimal(TimeField::Minutes) as u32,
            snapshot.decimal(TimeField::Seconds) as u32,
        )
    })
    .ok_or(SnapshotError::InvalidDateTime)
}

/// Overwrites every writable field of `snapshot` with `date_time`, deriving
/// the weekday mask from the date. Hundredths is left alone.
///
/// The chip only counts 2000..=2099; instants outside that span are clamped
/// to its first or last second.
pub fn apply_naive_date_time(snapshot: &mut TimeSnapshot, date_time: &NaiveDateTime) {
    let seconds = date_time.and_utc().timestamp();
    let clamped = seconds.clamp(i64::from(EPOCH_FLOOR), i64::from(EPOCH_CEILING));
    if clamped != seconds {
        debug!("rv3032: {} is outside 2000..=2099, clamping", seconds);
    }
    let Some(date_time) = DateTime::from_timestamp(clamped, 0).map(|dt| dt.naive_utc()) else {
        return;
    };

    snapshot.set_decimal(TimeField::Seconds, date_time.second() as u8);
    snapshot.set_decimal(TimeField::Minutes, date_time.minute() as u8);
    snapshot.set_decimal(TimeField::Hours, date_time.hour() as u8);
    snapshot.set_weekday(date_time.weekday().num_days_from_sunday() as u8);
    snapshot.set_decimal(TimeField::Date, date_time.day() as u8);
    snapshot.set_decimal(TimeField::Month, date_time.month() as u8);
    snapshot.set_decimal(TimeField::Year, (date_time.year() - 2000) as u8);
}

/// Seconds since the Unix epoch for the time held in `snapshot`.
pub fn to_epoch(snapshot: &TimeSnapshot) -> Result<u32, SnapshotError> {
    let seconds = to_naive_date_time(snapshot)?.and_utc().timestamp();
    u32::try_from(seconds).map_err(|_| SnapshotError::InvalidDateTime)
}

/// Loads `epoch` into `snapshot`, clamped to
/// [`EPOCH_FLOOR`]..=[`EPOCH_CEILING`].
pub fn apply_epoch(snapshot: &mut TimeSnapshot, epoch: u32) {
    if let Some(date_time) = DateTime::from_timestamp(i64::from(epoch), 0) {
        apply_naive_date_time(snapshot, &date_time.naive_utc());
    }
}

/// The cached time as a `datetime` value.
pub fn to_local_date_time(snapshot: &TimeSnapshot) -> Result<LocalDateTime, SnapshotError> {
    let date_time = to_naive_date_time(snapshot)?;
    let month = Month::from_zero(date_time.month0() as i8)
        .map_err(|_| SnapshotError::InvalidDateTime)?;
    let date = LocalDate::ymd(date_time.year() as i64, month, date_time.day() as i8)
        .map_err(|_| SnapshotError::InvalidDateTime)?;
    let time = LocalTime::hms(
        date_time.hour() as i8,
        date_time.minute() as i8,
        date_time.second() as i8,
    )
    .map_err(|_| SnapshotError::InvalidDateTime)?;
    Ok(LocalDateTime::new(date, time))
}

/// Loads a `datetime` value into `snapshot`, clamped like
/// [`apply_naive_date_time`].
pub fn apply_local_date_time(
    snapshot: &mut TimeSnapshot,
    date_time: &LocalDateTime,
) -> Result<(), SnapshotError> {
    let date = date_time.date();
    let time = date_time.time();
    let date_time = i32::try_from(date.year())
        .ok()
        .and_then(|year| {
            NaiveDate::from_ymd_opt(year, month_number(date.month()), date.day() as u32)
        })
        .and_then(|d| d.and_hms_opt(time.hour() as u32, time.minute() as u32, time.second() as u32))
        .ok_or(SnapshotError::InvalidDateTime)?;
    apply_naive_date_time(snapshot, &date_time);
    Ok(())
}

fn month_number(month: Month) -> u32 {
    match month {
        Month::January => 1,
        Month::February => 2,
        Month::March => 3,
        Month::April => 4,
        Month::May => 5,
        Month::June => 6,
        Month::July => 7,
        Month::August => 8,
        Month::September => 9,
        Month::October => 10,
        Month::November => 11,
        Month::December => 12,
    }
}
