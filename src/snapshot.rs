use crate::bcd::{bcd2bin, bin2bcd};

/// Number of time registers mirrored locally, hundredths through year.
pub const TIME_ARRAY_LENGTH: usize = 8;

/// Number of time registers the host may write. Hundredths is read-only.
pub const WRITABLE_LENGTH: usize = TIME_ARRAY_LENGTH - 1;

/// Position of each time register inside a [`TimeSnapshot`], which matches
/// the register order on the chip starting at address 0x00.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeField {
    Hundredths = 0,
    Seconds = 1,
    Minutes = 2,
    Hours = 3,
    Weekday = 4,
    Date = 5,
    Month = 6,
    Year = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotError {
    #[error("weekday register {0:#04x} is not a one-hot mask")]
    CorruptedWeekday(u8),
    #[error("expected {expected} time registers, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("time registers do not describe a valid date and time")]
    InvalidDateTime,
}

/// Twelve-hour clock face for a 0..=23 hour: 13..=23 become 1..=11, the rest
/// pass through.
pub fn fold_to_twelve_hour(hours: u8) -> u8 {
    if hours > 12 {
        hours - 12
    } else {
        hours
    }
}

/// One-hot weekday mask for `weekday` (0 = Sunday .. 6 = Saturday).
/// Anything past Saturday is clamped to Saturday.
pub fn mask_from_weekday(weekday: u8) -> u8 {
    1 << weekday.min(6)
}

/// Weekday index encoded in a one-hot mask.
pub fn weekday_from_mask(mask: u8) -> Result<u8, SnapshotError> {
    if mask.is_power_of_two() && mask < 0x80 {
        Ok(mask.trailing_zeros() as u8)
    } else {
        Err(SnapshotError::CorruptedWeekday(mask))
    }
}

/// Local mirror of the chip's time registers, kept exactly as the chip
/// stores them: BCD for every field, a one-hot mask for the weekday.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSnapshot([u8; TIME_ARRAY_LENGTH]);

impl TimeSnapshot {
    pub const fn from_registers(registers: [u8; TIME_ARRAY_LENGTH]) -> Self {
        TimeSnapshot(registers)
    }

    pub fn registers(&self) -> &[u8; TIME_ARRAY_LENGTH] {
        &self.0
    }

    /// The span sent to the chip on a write: everything but hundredths.
    pub fn writable(&self) -> [u8; WRITABLE_LENGTH] {
        let mut out = [0; WRITABLE_LENGTH];
        out.copy_from_slice(&self.0[TimeField::Seconds as usize..]);
        out
    }

    pub fn raw(&self, field: TimeField) -> u8 {
        self.0[field as usize]
    }

    pub fn set_raw(&mut self, field: TimeField, value: u8) {
        self.0[field as usize] = value;
    }

    /// Decimal value of a BCD field. The weekday is not BCD, use
    /// [`TimeSnapshot::weekday`] for it.
    pub fn decimal(&self, field: TimeField) -> u8 {
        bcd2bin(self.raw(field))
    }

    /// Stores `value` in `field`. A weekday is stored as a one-hot mask,
    /// every other field as BCD.
    pub fn set_decimal(&mut self, field: TimeField, value: u8) {
        match field {
            TimeField::Weekday => self.set_weekday(value),
            _ => self.set_raw(field, bin2bcd(value)),
        }
    }

    pub fn weekday(&self) -> Result<u8, SnapshotError> {
        weekday_from_mask(self.raw(TimeField::Weekday))
    }

    pub fn set_weekday(&mut self, weekday: u8) {
        self.set_raw(TimeField::Weekday, mask_from_weekday(weekday));
    }

    /// Hour for display. In twelve-hour mode afternoon hours fold onto
    /// 1..=12; midnight stays 0.
    pub fn display_hours(&self, twelve_hour: bool) -> u8 {
        let hours = self.decimal(TimeField::Hours);
        if twelve_hour {
            fold_to_twelve_hour(hours)
        } else {
            hours
        }
    }

    pub fn year(&self) -> u16 {
        self.decimal(TimeField::Year) as u16 + 2000
    }

    /// Picks the snapshot to keep after a multi-byte read that started at
    /// second 59. If the follow-up read shows second 0 the minute rolled
    /// over mid-transaction and the follow-up wins; otherwise the first
    /// read stands.
    ///
    /// Only the 59 -> 0 seconds boundary is guarded. A rollover that also
    /// carries into hours or the date inside the same window is not
    /// detected beyond that.
    pub fn reconcile(first: TimeSnapshot, second: TimeSnapshot) -> TimeSnapshot {
        if second.decimal(TimeField::Seconds) == 0 {
            second
        } else {
            first
        }
    }

    /// Whether a read of this snapshot needs a confirming second read.
    pub fn at_minute_boundary(&self) -> bool {
        self.decimal(TimeField::Seconds) == 59
    }
}

impl TryFrom<&[u8]> for TimeSnapshot {
    type Error = SnapshotError;

    fn try_from(registers: &[u8]) -> Result<Self, Self::Error> {
        let registers: [u8; TIME_ARRAY_LENGTH] =
            registers.try_into().map_err(|_| SnapshotError::Length {
                expected: TIME_ARRAY_LENGTH,
                actual: registers.len(),
            })?;
        Ok(TimeSnapshot(registers))
    }
}

/// Time captured on the last qualifying edge of the EVI pin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventTimestamp {
    pub hundredths: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
}

impl From<[u8; 4]> for EventTimestamp {
    fn from(registers: [u8; 4]) -> Self {
        EventTimestamp {
            hundredths: bcd2bin(registers[0]),
            seconds: bcd2bin(registers[1]),
            minutes: bcd2bin(registers[2]),
            hours: bcd2bin(registers[3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-14 15:30:59.42, Thursday
    const THURSDAY_AFTERNOON: [u8; 8] = [0x42, 0x59, 0x30, 0x15, 0x10, 0x14, 0x03, 0x24];

    #[test]
    fn weekday_masks_round_trip() {
        for day in 0..=6 {
            assert_eq!(weekday_from_mask(mask_from_weekday(day)), Ok(day));
        }
    }

    #[test]
    fn weekday_past_saturday_is_clamped() {
        assert_eq!(mask_from_weekday(7), 0x40);
        assert_eq!(mask_from_weekday(200), 0x40);
    }

    #[test]
    fn weekday_mask_must_be_one_hot() {
        assert_eq!(weekday_from_mask(0), Err(SnapshotError::CorruptedWeekday(0)));
        assert_eq!(
            weekday_from_mask(0b0000_0110),
            Err(SnapshotError::CorruptedWeekday(0b0000_0110))
        );
        assert_eq!(weekday_from_mask(0x80), Err(SnapshotError::CorruptedWeekday(0x80)));
    }

    #[test]
    fn fields_decode_from_registers() {
        let snapshot = TimeSnapshot::from_registers(THURSDAY_AFTERNOON);
        assert_eq!(snapshot.decimal(TimeField::Hundredths), 42);
        assert_eq!(snapshot.decimal(TimeField::Seconds), 59);
        assert_eq!(snapshot.decimal(TimeField::Minutes), 30);
        assert_eq!(snapshot.decimal(TimeField::Hours), 15);
        assert_eq!(snapshot.weekday(), Ok(4));
        assert_eq!(snapshot.decimal(TimeField::Date), 14);
        assert_eq!(snapshot.decimal(TimeField::Month), 3);
        assert_eq!(snapshot.year(), 2024);
    }

    #[test]
    fn writable_span_skips_hundredths() {
        let snapshot = TimeSnapshot::from_registers(THURSDAY_AFTERNOON);
        assert_eq!(snapshot.writable(), [0x59, 0x30, 0x15, 0x10, 0x14, 0x03, 0x24]);
    }

    #[test]
    fn set_decimal_encodes_per_field() {
        let mut snapshot = TimeSnapshot::default();
        snapshot.set_decimal(TimeField::Minutes, 45);
        snapshot.set_decimal(TimeField::Weekday, 9);
        assert_eq!(snapshot.raw(TimeField::Minutes), 0x45);
        assert_eq!(snapshot.raw(TimeField::Weekday), 0x40);
    }

    #[test]
    fn twelve_hour_display() {
        let mut snapshot = TimeSnapshot::default();
        snapshot.set_decimal(TimeField::Hours, 13);
        assert_eq!(snapshot.display_hours(true), 1);
        assert_eq!(snapshot.display_hours(false), 13);

        snapshot.set_decimal(TimeField::Hours, 12);
        assert_eq!(snapshot.display_hours(true), 12);

        snapshot.set_decimal(TimeField::Hours, 0);
        assert_eq!(snapshot.display_hours(true), 0);
        assert_eq!(snapshot.raw(TimeField::Hours), 0x00);
    }

    #[test]
    fn display_hours_matches_the_free_fold() {
        let mut snapshot = TimeSnapshot::default();
        for hours in 0..24 {
            snapshot.set_decimal(TimeField::Hours, hours);
            assert_eq!(snapshot.display_hours(true), fold_to_twelve_hour(hours));
        }
    }

    #[test]
    fn rollover_during_read_takes_second_snapshot() {
        let first = TimeSnapshot::from_registers(THURSDAY_AFTERNOON);
        let second = TimeSnapshot::from_registers([0x01, 0x00, 0x31, 0x15, 0x10, 0x14, 0x03, 0x24]);
        assert!(first.at_minute_boundary());
        assert_eq!(TimeSnapshot::reconcile(first, second), second);
    }

    #[test]
    fn no_rollover_keeps_first_snapshot() {
        let first = TimeSnapshot::from_registers(THURSDAY_AFTERNOON);
        let second = TimeSnapshot::from_registers([0x57, 0x59, 0x30, 0x15, 0x10, 0x14, 0x03, 0x24]);
        assert_eq!(TimeSnapshot::reconcile(first, second), first);
    }

    #[test]
    fn raw_slice_must_cover_every_register() {
        assert_eq!(
            TimeSnapshot::try_from(&THURSDAY_AFTERNOON[..7]),
            Err(SnapshotError::Length { expected: 8, actual: 7 })
        );
        assert_eq!(
            TimeSnapshot::try_from(&THURSDAY_AFTERNOON[..]),
            Ok(TimeSnapshot::from_registers(THURSDAY_AFTERNOON))
        );
    }

    #[test]
    fn event_timestamp_decodes_bcd() {
        let ts = EventTimestamp::from([0x99, 0x07, 0x45, 0x23]);
        assert_eq!(
            ts,
            EventTimestamp { hundredths: 99, seconds: 7, minutes: 45, hours: 23 }
        );
    }
}
