//! Human readable renderings of the cached time registers.

use crate::snapshot::{fold_to_twelve_hour, EventTimestamp, TimeField, TimeSnapshot};

fn meridiem(hours: u8) -> &'static str {
    if hours >= 12 {
        "PM"
    } else {
        "AM"
    }
}

/// `MM/DD/YYYY`
pub fn date_usa(time: &TimeSnapshot) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        time.decimal(TimeField::Month),
        time.decimal(TimeField::Date),
        time.year()
    )
}

/// `DD/MM/YYYY`
pub fn date(time: &TimeSnapshot) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        time.decimal(TimeField::Date),
        time.decimal(TimeField::Month),
        time.year()
    )
}

/// `hh:mm:ss`, with an `AM`/`PM` suffix in twelve-hour mode.
pub fn time(time: &TimeSnapshot, twelve_hour_mode: bool) -> String {
    let hours = time.decimal(TimeField::Hours);
    let minutes = time.decimal(TimeField::Minutes);
    let seconds = time.decimal(TimeField::Seconds);
    if twelve_hour_mode {
        format!(
            "{:02}:{:02}:{:02}{}",
            time.display_hours(true),
            minutes,
            seconds,
            meridiem(hours)
        )
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// ISO 8601, `YYYY-MM-DDThh:mm:ss`. Always 24-hour.
pub fn time_8601(time: &TimeSnapshot) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        time.year(),
        time.decimal(TimeField::Month),
        time.decimal(TimeField::Date),
        time.decimal(TimeField::Hours),
        time.decimal(TimeField::Minutes),
        time.decimal(TimeField::Seconds)
    )
}

/// `hh:mm:ss:HH` for an EVI capture, with `AM`/`PM` in twelve-hour mode.
pub fn timestamp(capture: &EventTimestamp, twelve_hour_mode: bool) -> String {
    if twelve_hour_mode {
        format!(
            "{:02}:{:02}:{:02}:{:02}{}",
            fold_to_twelve_hour(capture.hours),
            capture.minutes,
            capture.seconds,
            capture.hundredths,
            meridiem(capture.hours)
        )
    } else {
        format!(
            "{:02}:{:02}:{:02}:{:02}",
            capture.hours, capture.minutes, capture.seconds, capture.hundredths
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-04 17:05:09.31
    const SAMPLE: TimeSnapshot =
        TimeSnapshot::from_registers([0x31, 0x09, 0x05, 0x17, 0x02, 0x04, 0x03, 0x24]);

    #[test]
    fn dates() {
        assert_eq!(date_usa(&SAMPLE), "03/04/2024");
        assert_eq!(date(&SAMPLE), "04/03/2024");
    }

    #[test]
    fn times() {
        assert_eq!(time(&SAMPLE, false), "17:05:09");
        assert_eq!(time(&SAMPLE, true), "05:05:09PM");
        assert_eq!(time_8601(&SAMPLE), "2024-03-04T17:05:09");
    }

    #[test]
    fn noon_and_midnight() {
        let mut noon = SAMPLE;
        noon.set_decimal(TimeField::Hours, 12);
        assert_eq!(time(&noon, true), "12:05:09PM");

        let mut midnight = SAMPLE;
        midnight.set_decimal(TimeField::Hours, 0);
        assert_eq!(time(&midnight, true), "00:05:09AM");
    }

    #[test]
    fn timestamps() {
        let capture = EventTimestamp { hundredths: 7, seconds: 59, minutes: 0, hours: 23 };
        assert_eq!(timestamp(&capture, false), "23:00:59:07");
        assert_eq!(timestamp(&capture, true), "11:00:59:07PM");
    }

    #[test]
    fn capture_and_clock_fold_hours_alike() {
        for hours in 0..24 {
            let mut clock = SAMPLE;
            clock.set_decimal(TimeField::Hours, hours);
            let capture = EventTimestamp { hundredths: 31, seconds: 9, minutes: 5, hours };
            let expected = format!("{}:31{}", &time(&clock, true)[..8], &time(&clock, true)[8..]);
            assert_eq!(timestamp(&capture, true), expected);
        }
    }
}
