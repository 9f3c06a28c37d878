//! Register map of the RV-3032-C7 and the bit fields the driver touches.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    Hundredths = 0x00,
    Seconds = 0x01,
    Minutes = 0x02,
    Hours = 0x03,
    Weekday = 0x04,
    Date = 0x05,
    Month = 0x06,
    Year = 0x07,
    MinutesAlarm = 0x08,
    HoursAlarm = 0x09,
    DateAlarm = 0x0A,
    Timer0 = 0x0B,
    Timer1 = 0x0C,
    Status = 0x0D,
    Control1 = 0x10,
    Control2 = 0x11,
    Control3 = 0x12,
    TimestampControl = 0x13,
    EviControl = 0x15,
    HundredthsCapture = 0x27,
    SecondsCapture = 0x28,
    MinutesCapture = 0x29,
    HoursCapture = 0x2A,
    EepromOffset = 0xC1,
    EepromClockOut2 = 0xC3,
}

impl From<Register> for u8 {
    fn from(register: Register) -> Self {
        register as u8
    }
}

/// Location of a one- or two-bit field inside a register.
///
/// `active_low` marks fields whose "enabled" meaning is a cleared bit.
/// The raw bit accessors ignore it; only the enable helpers built on
/// [`BitField::encode_enabled`] and [`BitField::decode_enabled`] apply it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    pub register: Register,
    pub offset: u8,
    pub width: u8,
    pub active_low: bool,
}

impl BitField {
    const fn bit(register: Register, offset: u8) -> Self {
        BitField { register, offset, width: 1, active_low: false }
    }

    const fn bit_active_low(register: Register, offset: u8) -> Self {
        BitField { register, offset, width: 1, active_low: true }
    }

    const fn pair(register: Register, offset: u8) -> Self {
        BitField { register, offset, width: 2, active_low: false }
    }

    pub const fn mask(&self) -> u8 {
        ((1u8 << self.width) - 1) << self.offset
    }

    pub const fn extract(&self, register_value: u8) -> u8 {
        (register_value & self.mask()) >> self.offset
    }

    /// `register_value` with the field replaced by `value`; every bit
    /// outside the field is preserved.
    pub const fn insert(&self, register_value: u8, value: u8) -> u8 {
        (register_value & !self.mask()) | ((value << self.offset) & self.mask())
    }

    pub const fn encode_enabled(&self, enabled: bool) -> bool {
        enabled != self.active_low
    }

    pub const fn decode_enabled(&self, bit: bool) -> bool {
        bit != self.active_low
    }

    // Alarm match enables, cleared to compare the field.
    pub const ALARM_MINUTES_ENABLE: BitField = BitField::bit_active_low(Register::MinutesAlarm, 7);
    pub const ALARM_HOURS_ENABLE: BitField = BitField::bit_active_low(Register::HoursAlarm, 7);
    pub const ALARM_DATE_ENABLE: BitField = BitField::bit_active_low(Register::DateAlarm, 7);

    pub const UPDATE_INTERRUPT_SELECT: BitField = BitField::bit(Register::Control1, 4);
    pub const TIMER_ENABLE: BitField = BitField::bit(Register::Control1, 3);
    // EERD: set disables the automatic EEPROM refresh.
    pub const EEPROM_REFRESH: BitField = BitField::bit_active_low(Register::Control1, 2);
    pub const TIMER_FREQUENCY: BitField = BitField::pair(Register::Control1, 0);

    pub const STOP: BitField = BitField::bit(Register::Control2, 0);

    pub const TIMESTAMP_RESET: BitField = BitField::bit(Register::TimestampControl, 7);
    pub const TIMESTAMP_OVERWRITE: BitField = BitField::bit(Register::TimestampControl, 2);

    pub const EVI_EDGE: BitField = BitField::bit(Register::EviControl, 6);
    pub const EVI_DEBOUNCE: BitField = BitField::pair(Register::EviControl, 4);
    pub const EVI_CALIBRATION_SYNC: BitField = BitField::bit(Register::EviControl, 0);

    pub const CLOCK_OUT_FREQUENCY: BitField = BitField::pair(Register::EepromClockOut2, 5);
}

/// Alarm registers keep their enable bit above the BCD value.
pub const ALARM_VALUE_MASK: u8 = 0x7F;

/// Bits of TIMER_1 that carry timer ticks 11:8.
pub const TIMER_HIGH_MASK: u8 = 0x0F;

/// Bits of EEPROM_OFFSET that carry the calibration offset.
pub const OFFSET_MASK: u8 = 0x3F;

/// Calibration step of the offset register, in ppm.
pub const PPM_PER_STEP: f32 = 0.2384;

/// Interrupt enable bits of CONTROL2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    ClockOutput = 6,
    Update = 5,
    Timer = 4,
    Alarm = 3,
    ExternalEvent = 2,
}

/// Sticky flags of the STATUS register. Each stays set until cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    TemperatureHigh = 7,
    TemperatureLow = 6,
    Update = 5,
    Timer = 4,
    Alarm = 3,
    ExternalEvent = 2,
    PowerOnReset = 1,
    VoltageLow = 0,
}

macro_rules! two_bit_setting {
    ($typ:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $typ {
            $($variant = $value),+
        }

        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                match v & 0b11 {
                    $($value => $typ::$variant,)+
                    _ => unreachable!(),
                }
            }
        }

        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v as u8
            }
        }
    };
}

two_bit_setting!(CountdownFrequency {
    Hz4096 = 0b00,
    Hz64 = 0b01,
    Hz1 = 0b10,
    PerMinute = 0b11,
});

two_bit_setting!(ClockOutFrequency {
    Hz32768 = 0b00,
    Hz1024 = 0b01,
    Hz64 = 0b10,
    Hz1 = 0b11,
});

two_bit_setting!(EviDebounce {
    None = 0b00,
    Hz256 = 0b01,
    Hz64 = 0b10,
    Hz8 = 0b11,
});

/// Source of the periodic time update interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateInterval {
    Second,
    Minute,
}

impl From<bool> for UpdateInterval {
    fn from(bit: bool) -> Self {
        if bit {
            UpdateInterval::Minute
        } else {
            UpdateInterval::Second
        }
    }
}

/// Edge of the EVI pin that captures a timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Falling,
    Rising,
}

impl From<bool> for Edge {
    fn from(bit: bool) -> Self {
        if bit {
            Edge::Rising
        } else {
            Edge::Falling
        }
    }
}

/// Encodes a calibration offset in ppm as the 6-bit two's complement
/// step count of the offset register, clamped to -32..=31 steps.
pub fn offset_steps(ppm: f32) -> u8 {
    let steps = (ppm / PPM_PER_STEP) as i32;
    (steps.clamp(-32, 31) as i8 as u8) & OFFSET_MASK
}

/// Decodes the low six bits of the offset register into ppm.
pub fn offset_ppm(register_value: u8) -> f32 {
    let mut steps = (register_value & OFFSET_MASK) as i8;
    if steps > 31 {
        steps -= 64;
    }
    steps as f32 * PPM_PER_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_cover_the_field() {
        assert_eq!(BitField::ALARM_MINUTES_ENABLE.mask(), 0b1000_0000);
        assert_eq!(BitField::TIMER_FREQUENCY.mask(), 0b0000_0011);
        assert_eq!(BitField::EVI_DEBOUNCE.mask(), 0b0011_0000);
        assert_eq!(BitField::CLOCK_OUT_FREQUENCY.mask(), 0b0110_0000);
    }

    #[test]
    fn insert_keeps_neighbouring_bits() {
        let field = BitField::TIMER_ENABLE;
        assert_eq!(field.insert(0b1111_0111, 1), 0b1111_1111);
        assert_eq!(field.insert(0b1111_1111, 0), 0b1111_0111);

        let field = BitField::EVI_DEBOUNCE;
        assert_eq!(field.insert(0b1100_1111, 0b10), 0b1110_1111);
        assert_eq!(field.insert(0b1111_1111, 0b00), 0b1100_1111);
    }

    #[test]
    fn insert_drops_value_bits_outside_the_field() {
        assert_eq!(BitField::EVI_DEBOUNCE.insert(0, 0b111), 0b0011_0000);
    }

    #[test]
    fn extract_reads_back_inserted_value() {
        let field = BitField::CLOCK_OUT_FREQUENCY;
        for value in 0..4 {
            assert_eq!(field.extract(field.insert(0b1001_1111, value)), value);
        }
    }

    #[test]
    fn polarity_is_applied_by_enable_helpers() {
        let alarm = BitField::ALARM_HOURS_ENABLE;
        assert!(!alarm.encode_enabled(true));
        assert!(alarm.decode_enabled(false));

        let timer = BitField::TIMER_ENABLE;
        assert!(timer.encode_enabled(true));
        assert!(timer.decode_enabled(true));
    }

    #[test]
    fn two_bit_settings_ignore_upper_bits() {
        assert_eq!(CountdownFrequency::from(0b110), CountdownFrequency::Hz1);
        assert_eq!(ClockOutFrequency::from(0b11), ClockOutFrequency::Hz1);
        assert_eq!(u8::from(EviDebounce::Hz64), 0b10);
    }

    #[test]
    fn offset_encoding() {
        assert_eq!(offset_steps(0.0), 0);
        assert_eq!(offset_steps(2.4), 10);
        assert_eq!(offset_steps(-0.2384 * 1.5), 0b11_1111);
        assert_eq!(offset_steps(100.0), 31);
        assert_eq!(offset_steps(-100.0), 0b10_0000);
    }

    #[test]
    fn offset_decoding_is_sign_extended() {
        assert_eq!(offset_ppm(0), 0.0);
        assert!((offset_ppm(31) - 31.0 * PPM_PER_STEP).abs() < 1e-4);
        assert!((offset_ppm(0b10_0000) + 32.0 * PPM_PER_STEP).abs() < 1e-4);
        assert!((offset_ppm(0b1111_1111) + PPM_PER_STEP).abs() < 1e-4);
    }
}
