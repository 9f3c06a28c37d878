// MUST be the first module
mod fmt;

pub mod bcd;
pub mod epoch;
mod error;
pub mod format;
pub mod registers;
pub mod snapshot;

use datetime::LocalDateTime;
use embedded_hal::i2c::I2c;

use crate::bcd::{bcd2bin, bin2bcd};
pub use crate::error::Error;
pub use crate::registers::{
    BitField, ClockOutFrequency, CountdownFrequency, Edge, EviDebounce, Flag, Interrupt, Register,
    UpdateInterval,
};
use crate::registers::{ALARM_VALUE_MASK, OFFSET_MASK, TIMER_HIGH_MASK};
pub use crate::snapshot::{EventTimestamp, SnapshotError, TimeField, TimeSnapshot};
use crate::snapshot::{TIME_ARRAY_LENGTH, WRITABLE_LENGTH};

const DEFAULT_ADDRESS: u8 = 0x51;

/// RV-3032-C7
/// Real-Time Clock (RTC) Module with I2C-Bus Interface
///
/// The driver keeps a local copy of the time registers. [`Rv3032::update_time`]
/// refreshes it from the chip; the time getters and the string renderers only
/// look at that copy. Every time setter changes the copy and then rewrites all
/// writable time registers in one transaction.
pub struct Rv3032<I2C> {
    i2c: I2C,
    address: u8,
    time: TimeSnapshot,
    twelve_hour: bool,
}

impl<I2C, E> Rv3032<I2C>
where
    I2C: I2c<Error = E>,
{
    /// New driver instance, assumes that there is no i2c mux
    /// sitting between the RTC and the host.
    pub fn new(i2c: I2C) -> Self {
        Rv3032 {
            i2c,
            address: DEFAULT_ADDRESS,
            time: TimeSnapshot::default(),
            twelve_hour: true,
        }
    }

    pub fn with_address(self: Self, address: u8) -> Self {
        Rv3032 { address, ..self }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Checks that the chip acknowledges its address.
    pub fn probe(&mut self) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[])?;
        Ok(())
    }

    pub fn set_12_hour(&mut self) {
        self.twelve_hour = true;
    }

    pub fn set_24_hour(&mut self) {
        self.twelve_hour = false;
    }

    pub fn is_12_hour(&self) -> bool {
        self.twelve_hour
    }

    /// True in twelve-hour mode when the cached hour is noon or later.
    pub fn is_pm(&self) -> bool {
        self.twelve_hour && self.time.decimal(TimeField::Hours) >= 12
    }

    // ---- time registers ----

    pub fn snapshot(&self) -> &TimeSnapshot {
        &self.time
    }

    /// Writes seconds through year of `snapshot` to the chip. Hundredths is
    /// read-only and never sent.
    pub fn write_snapshot(&mut self, snapshot: &TimeSnapshot) -> Result<(), Error<E>> {
        self.write_time_registers(&snapshot.writable())
    }

    /// Replaces the cached registers with a raw hundredths..year array and
    /// writes it to the chip.
    pub fn set_time_registers(&mut self, registers: &[u8]) -> Result<(), Error<E>> {
        self.time = TimeSnapshot::try_from(registers).map_err(Error::Snapshot)?;
        self.write_cached_time()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_time(
        &mut self,
        sec: u8,
        min: u8,
        hour: u8,
        weekday: u8,
        date: u8,
        month: u8,
        year: u16,
    ) -> Result<(), Error<E>> {
        self.time.set_decimal(TimeField::Seconds, sec);
        self.time.set_decimal(TimeField::Minutes, min);
        self.time.set_decimal(TimeField::Hours, hour);
        self.time.set_weekday(weekday);
        self.time.set_decimal(TimeField::Date, date);
        self.time.set_decimal(TimeField::Month, month);
        self.time.set_decimal(TimeField::Year, years_since_2000(year));
        self.write_cached_time()
    }

    /// Changes one field of the cached time and rewrites every writable
    /// time register.
    pub fn set_field(&mut self, field: TimeField, value: u8) -> Result<(), Error<E>> {
        self.time.set_decimal(field, value);
        self.write_cached_time()
    }

    pub fn set_seconds(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Seconds, value)
    }

    pub fn set_minutes(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Minutes, value)
    }

    pub fn set_hours(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Hours, value)
    }

    /// 0 = Sunday .. 6 = Saturday; larger values are clamped to Saturday.
    pub fn set_weekday(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Weekday, value)
    }

    pub fn set_date(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Date, value)
    }

    pub fn set_month(&mut self, value: u8) -> Result<(), Error<E>> {
        self.set_field(TimeField::Month, value)
    }

    /// Years outside 2000..=2099 are clamped to that span.
    pub fn set_year(&mut self, value: u16) -> Result<(), Error<E>> {
        self.set_field(TimeField::Year, years_since_2000(value))
    }

    /// Reloads the cached time from the chip.
    ///
    /// When the first read lands on second 59 the registers are read a second
    /// time and [`TimeSnapshot::reconcile`] decides which copy to keep. On a
    /// bus error the cache is left as it was.
    pub fn update_time(&mut self) -> Result<(), Error<E>> {
        let first = self.read_time_registers()?;
        let time = if first.at_minute_boundary() {
            let second = self.read_time_registers()?;
            let kept = TimeSnapshot::reconcile(first, second);
            if kept == second {
                debug!("rv3032: minute rolled over during read, using second read");
            }
            kept
        } else {
            first
        };
        self.time = time;
        Ok(())
    }

    pub fn hundredths(&self) -> u8 {
        self.time.decimal(TimeField::Hundredths)
    }

    pub fn seconds(&self) -> u8 {
        self.time.decimal(TimeField::Seconds)
    }

    pub fn minutes(&self) -> u8 {
        self.time.decimal(TimeField::Minutes)
    }

    /// Cached hour, folded onto 1..=12 for afternoon hours in twelve-hour mode.
    pub fn hours(&self) -> u8 {
        self.time.display_hours(self.twelve_hour)
    }

    pub fn date(&self) -> u8 {
        self.time.decimal(TimeField::Date)
    }

    /// 0 = Sunday .. 6 = Saturday.
    pub fn weekday(&self) -> Result<u8, Error<E>> {
        self.time.weekday().map_err(|e| {
            warn!(
                "rv3032: corrupted weekday register {:#x}",
                self.time.raw(TimeField::Weekday)
            );
            Error::Snapshot(e)
        })
    }

    pub fn month(&self) -> u8 {
        self.time.decimal(TimeField::Month)
    }

    pub fn year(&self) -> u16 {
        self.time.year()
    }

    /// Seconds since 1970-01-01T00:00:00Z of the cached time.
    pub fn epoch(&self) -> Result<u32, Error<E>> {
        epoch::to_epoch(&self.time).map_err(Error::Snapshot)
    }

    /// Sets the chip from Unix time. Anything before 2000 is clamped to
    /// 2000-01-01T00:00:00Z.
    pub fn set_epoch(&mut self, value: u32) -> Result<(), Error<E>> {
        epoch::apply_epoch(&mut self.time, value);
        self.write_cached_time()
    }

    pub fn local_date_time(&self) -> Result<LocalDateTime, Error<E>> {
        epoch::to_local_date_time(&self.time).map_err(Error::Snapshot)
    }

    pub fn set_local_date_time(&mut self, date_time: LocalDateTime) -> Result<(), Error<E>> {
        epoch::apply_local_date_time(&mut self.time, &date_time).map_err(Error::Snapshot)?;
        self.write_cached_time()
    }

    pub fn is_stopped(&mut self) -> Result<bool, Error<E>> {
        self.read_field(BitField::STOP).map(|bit| bit != 0)
    }

    pub fn set_stopped(&mut self, stopped: bool) -> Result<(), Error<E>> {
        self.write_field(BitField::STOP, stopped as u8)
    }

    /// Resets the sub-second prescaler by pulsing the STOP bit.
    pub fn set_hundredths_to_zero(&mut self) -> Result<(), Error<E>> {
        self.set_stopped(true)?;
        self.set_stopped(false)
    }

    // ---- string rendering ----

    pub fn string_date_usa(&self) -> String {
        format::date_usa(&self.time)
    }

    pub fn string_date(&self) -> String {
        format::date(&self.time)
    }

    pub fn string_time(&self) -> String {
        format::time(&self.time, self.twelve_hour)
    }

    pub fn string_time_8601(&self) -> String {
        format::time_8601(&self.time)
    }

    /// Last EVI capture; reads the capture registers.
    pub fn string_timestamp(&mut self) -> Result<String, Error<E>> {
        let capture = self.event_timestamp()?;
        Ok(format::timestamp(&capture, self.twelve_hour))
    }

    // ---- alarm ----

    /// Selects which fields must match for the alarm to fire.
    pub fn set_items_to_match_for_alarm(
        &mut self,
        minute: bool,
        hour: bool,
        date: bool,
    ) -> Result<(), Error<E>> {
        self.set_enabled(BitField::ALARM_MINUTES_ENABLE, minute)?;
        self.set_enabled(BitField::ALARM_HOURS_ENABLE, hour)?;
        self.set_enabled(BitField::ALARM_DATE_ENABLE, date)
    }

    pub fn set_alarm_minutes(&mut self, minute: u8) -> Result<(), Error<E>> {
        self.write_alarm(Register::MinutesAlarm, minute)
    }

    pub fn set_alarm_hours(&mut self, hour: u8) -> Result<(), Error<E>> {
        self.write_alarm(Register::HoursAlarm, hour)
    }

    pub fn set_alarm_date(&mut self, date: u8) -> Result<(), Error<E>> {
        self.write_alarm(Register::DateAlarm, date)
    }

    pub fn alarm_minutes(&mut self) -> Result<u8, Error<E>> {
        self.read_alarm(Register::MinutesAlarm)
    }

    pub fn alarm_hours(&mut self) -> Result<u8, Error<E>> {
        self.read_alarm(Register::HoursAlarm)
    }

    pub fn alarm_date(&mut self) -> Result<u8, Error<E>> {
        self.read_alarm(Register::DateAlarm)
    }

    fn write_alarm(&mut self, reg: Register, value: u8) -> Result<(), Error<E>> {
        let current = self.read_register(reg.into())?;
        self.write_register(
            reg.into(),
            (current & !ALARM_VALUE_MASK) | (bin2bcd(value) & ALARM_VALUE_MASK),
        )
    }

    fn read_alarm(&mut self, reg: Register) -> Result<u8, Error<E>> {
        let value = self.read_register(reg.into())?;
        Ok(bcd2bin(value & ALARM_VALUE_MASK))
    }

    // ---- countdown timer and periodic update ----

    pub fn set_countdown_timer_enable(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.set_enabled(BitField::TIMER_ENABLE, enabled)
    }

    pub fn countdown_timer_enable(&mut self) -> Result<bool, Error<E>> {
        self.enabled(BitField::TIMER_ENABLE)
    }

    pub fn set_countdown_timer_frequency(
        &mut self,
        frequency: CountdownFrequency,
    ) -> Result<(), Error<E>> {
        self.write_field(BitField::TIMER_FREQUENCY, frequency.into())
    }

    pub fn countdown_timer_frequency(&mut self) -> Result<CountdownFrequency, Error<E>> {
        self.read_field(BitField::TIMER_FREQUENCY).map(CountdownFrequency::from)
    }

    /// Loads the 12-bit countdown value. The upper nibble of TIMER_1 is kept.
    pub fn set_countdown_timer_clock_ticks(&mut self, ticks: u16) -> Result<(), Error<E>> {
        let high = self.read_register(Register::Timer1.into())?;
        let high = (high & !TIMER_HIGH_MASK) | ((ticks >> 8) as u8 & TIMER_HIGH_MASK);
        self.write_register(Register::Timer1.into(), high)?;
        self.write_register(Register::Timer0.into(), ticks as u8)
    }

    pub fn countdown_timer_clock_ticks(&mut self) -> Result<u16, Error<E>> {
        let [low, high] = self.read_registers::<2>(Register::Timer0.into())?;
        Ok((((high & TIMER_HIGH_MASK) as u16) << 8) | low as u16)
    }

    pub fn set_periodic_time_update_frequency(
        &mut self,
        interval: UpdateInterval,
    ) -> Result<(), Error<E>> {
        self.write_bit(
            BitField::UPDATE_INTERRUPT_SELECT.register.into(),
            BitField::UPDATE_INTERRUPT_SELECT.offset,
            interval == UpdateInterval::Minute,
        )
    }

    pub fn periodic_time_update_frequency(&mut self) -> Result<UpdateInterval, Error<E>> {
        self.read_bit(
            BitField::UPDATE_INTERRUPT_SELECT.register.into(),
            BitField::UPDATE_INTERRUPT_SELECT.offset,
        )
        .map(UpdateInterval::from)
    }

    /// Automatic refresh of the configuration RAM from EEPROM.
    pub fn set_eeprom_refresh(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.set_enabled(BitField::EEPROM_REFRESH, enabled)
    }

    pub fn eeprom_refresh(&mut self) -> Result<bool, Error<E>> {
        self.enabled(BitField::EEPROM_REFRESH)
    }

    pub fn set_clock_out_frequency(
        &mut self,
        frequency: ClockOutFrequency,
    ) -> Result<(), Error<E>> {
        self.write_field(BitField::CLOCK_OUT_FREQUENCY, frequency.into())
    }

    pub fn clock_out_frequency(&mut self) -> Result<ClockOutFrequency, Error<E>> {
        self.read_field(BitField::CLOCK_OUT_FREQUENCY).map(ClockOutFrequency::from)
    }

    // ---- interrupts and flags ----

    pub fn enable_interrupt(&mut self, source: Interrupt) -> Result<(), Error<E>> {
        self.write_bit(Register::Control2.into(), source as u8, true)
    }

    pub fn disable_interrupt(&mut self, source: Interrupt) -> Result<(), Error<E>> {
        self.write_bit(Register::Control2.into(), source as u8, false)
    }

    /// Clears every interrupt enable in CONTROL2, leaving STOP as it is.
    pub fn disable_all_interrupts(&mut self) -> Result<(), Error<E>> {
        let value = self.read_register(Register::Control2.into())?;
        self.write_register(Register::Control2.into(), value & BitField::STOP.mask())
    }

    pub fn interrupt_flag(&mut self, flag: Flag) -> Result<bool, Error<E>> {
        self.read_bit(Register::Status.into(), flag as u8)
    }

    pub fn clear_interrupt_flag(&mut self, flag: Flag) -> Result<(), Error<E>> {
        self.write_bit(Register::Status.into(), flag as u8, false)
    }

    pub fn clear_all_interrupt_flags(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::Status.into(), 0)
    }

    // ---- calibration ----

    /// Aging/frequency offset in ppm, about 0.2384 ppm per step, clamped to
    /// -32..=31 steps.
    pub fn set_calibration_offset(&mut self, ppm: f32) -> Result<(), Error<E>> {
        let current = self.read_register(Register::EepromOffset.into())?;
        self.write_register(
            Register::EepromOffset.into(),
            (current & !OFFSET_MASK) | registers::offset_steps(ppm),
        )
    }

    pub fn calibration_offset(&mut self) -> Result<f32, Error<E>> {
        self.read_register(Register::EepromOffset.into())
            .map(registers::offset_ppm)
    }

    // ---- external event input ----

    pub fn set_evi_calibration(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.set_enabled(BitField::EVI_CALIBRATION_SYNC, enabled)
    }

    pub fn evi_calibration(&mut self) -> Result<bool, Error<E>> {
        self.enabled(BitField::EVI_CALIBRATION_SYNC)
    }

    pub fn set_evi_debounce_time(&mut self, debounce: EviDebounce) -> Result<(), Error<E>> {
        self.write_two_bit_field(
            BitField::EVI_DEBOUNCE.register.into(),
            BitField::EVI_DEBOUNCE.offset,
            debounce.into(),
        )
    }

    pub fn evi_debounce_time(&mut self) -> Result<EviDebounce, Error<E>> {
        self.read_two_bits(
            BitField::EVI_DEBOUNCE.register.into(),
            BitField::EVI_DEBOUNCE.offset,
        )
        .map(EviDebounce::from)
    }

    pub fn set_evi_edge_detection(&mut self, edge: Edge) -> Result<(), Error<E>> {
        self.write_field(BitField::EVI_EDGE, (edge == Edge::Rising) as u8)
    }

    pub fn evi_edge_detection(&mut self) -> Result<Edge, Error<E>> {
        self.read_field(BitField::EVI_EDGE).map(|bit| Edge::from(bit != 0))
    }

    /// Whether a new event overwrites the captured timestamp or the first
    /// capture is kept.
    pub fn set_timestamp_overwrite(&mut self, overwrite: bool) -> Result<(), Error<E>> {
        self.set_enabled(BitField::TIMESTAMP_OVERWRITE, overwrite)
    }

    pub fn reset_timestamp(&mut self) -> Result<(), Error<E>> {
        self.set_enabled(BitField::TIMESTAMP_RESET, true)
    }

    pub fn hundredths_capture(&mut self) -> Result<u8, Error<E>> {
        self.read_register(Register::HundredthsCapture.into()).map(bcd2bin)
    }

    pub fn seconds_capture(&mut self) -> Result<u8, Error<E>> {
        self.read_register(Register::SecondsCapture.into()).map(bcd2bin)
    }

    pub fn minutes_capture(&mut self) -> Result<u8, Error<E>> {
        self.read_register(Register::MinutesCapture.into()).map(bcd2bin)
    }

    pub fn hours_capture(&mut self) -> Result<u8, Error<E>> {
        self.read_register(Register::HoursCapture.into()).map(bcd2bin)
    }

    pub fn event_timestamp(&mut self) -> Result<EventTimestamp, Error<E>> {
        self.read_registers::<4>(Register::HundredthsCapture.into())
            .map(EventTimestamp::from)
    }

    // ---- bit fields ----

    pub fn read_bit(&mut self, reg: u8, offset: u8) -> Result<bool, Error<E>> {
        Ok(self.read_masked(reg, offset, 0b1)? != 0)
    }

    pub fn read_two_bits(&mut self, reg: u8, offset: u8) -> Result<u8, Error<E>> {
        self.read_masked(reg, offset, 0b11)
    }

    /// Read-modify-write of a single bit; the other seven bits are kept.
    pub fn write_bit(&mut self, reg: u8, offset: u8, value: bool) -> Result<(), Error<E>> {
        self.modify_register(reg, offset, 0b1, value as u8)
    }

    /// Read-modify-write of a two-bit field; the other six bits are kept.
    pub fn write_two_bit_field(&mut self, reg: u8, offset: u8, value: u8) -> Result<(), Error<E>> {
        self.modify_register(reg, offset, 0b11, value)
    }

    pub fn read_field(&mut self, field: BitField) -> Result<u8, Error<E>> {
        let value = self.read_register(field.register.into())?;
        Ok(field.extract(value))
    }

    pub fn write_field(&mut self, field: BitField, value: u8) -> Result<(), Error<E>> {
        let current = self.read_register(field.register.into())?;
        self.write_register(field.register.into(), field.insert(current, value))
    }

    /// Logical state of a one-bit enable, honouring active-low fields.
    pub fn enabled(&mut self, field: BitField) -> Result<bool, Error<E>> {
        let bit = self.read_field(field)? != 0;
        Ok(field.decode_enabled(bit))
    }

    pub fn set_enabled(&mut self, field: BitField, enabled: bool) -> Result<(), Error<E>> {
        self.write_field(field, field.encode_enabled(enabled) as u8)
    }

    fn read_masked(&mut self, reg: u8, offset: u8, mask: u8) -> Result<u8, Error<E>> {
        let value = self.read_register(reg)?;
        Ok((value >> offset) & mask)
    }

    fn modify_register(&mut self, reg: u8, offset: u8, mask: u8, value: u8) -> Result<(), Error<E>> {
        let current = self.read_register(reg)?;
        let updated = (current & !(mask << offset)) | ((value & mask) << offset);
        self.write_register(reg, updated)
    }

    // ---- bus ----

    fn write_cached_time(&mut self) -> Result<(), Error<E>> {
        let registers = self.time.writable();
        self.write_time_registers(&registers)
    }

    fn write_time_registers(&mut self, data: &[u8; WRITABLE_LENGTH]) -> Result<(), Error<E>> {
        let mut buffer = [0u8; WRITABLE_LENGTH + 1];
        buffer[0] = Register::Seconds.into();
        buffer[1..].copy_from_slice(data);
        trace!("rv3032: writing time registers");
        self.i2c.write(self.address, &buffer)?;
        Ok(())
    }

    fn read_time_registers(&mut self) -> Result<TimeSnapshot, Error<E>> {
        self.read_registers::<TIME_ARRAY_LENGTH>(Register::Hundredths.into())
            .map(TimeSnapshot::from_registers)
    }

    pub fn write_register(&mut self, reg: u8, data: u8) -> Result<(), Error<E>> {
        trace!("rv3032: write {:#x} <- {:#x}", reg, data);
        self.i2c.write(self.address, &[reg, data])?;
        Ok(())
    }

    pub fn read_register(&mut self, reg: u8) -> Result<u8, Error<E>> {
        self.read_registers::<1>(reg).map(|regs| regs[0])
    }

    fn read_registers<const N: usize>(&mut self, reg: u8) -> Result<[u8; N], Error<E>> {
        let mut buf: [u8; N] = [0; N];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        Ok(buf)
    }
}

/// Year register value for `year`, clamped to the 2000..=2099 span the chip
/// counts.
fn years_since_2000(year: u16) -> u8 {
    (year.clamp(2000, 2099) - 2000) as u8
}
