use bitfield::bitfield;
use libm::pow;

use crate::constants::{
    LPS3X_PRESSURE_LSB_PER_HPA, LPS3X_SINGLE_SHOT_CONVERSION_MS, LPS3X_TEMPERATURE_LSB_PER_C,
    LPS3X_WHO_AM_I_VALUE,
};
use crate::field::{BitField, InvalidFieldValue, ValidValues};


/// CTRL_REG1 (0x10) fields. Bit 0 (SIM) and bit 7 are not modelled and survive every write.
pub struct CtrlReg1;

impl CtrlReg1 {
    /// Output data rate selection
    pub const ODR: BitField = BitField::new("ODR", 4, 7, "output data rate selection")
        .with_valid_values(ValidValues::Span { start: 0, end: 6 });
    /// Enable low-pass filter on pressure data
    pub const EN_LPFP: BitField =
        BitField::new("EN_LPFP", 3, 4, "enable low-pass filter on pressure data");
    /// Low-pass filter bandwidth, ODR/9 (0) or ODR/20 (1)
    pub const LPFP_CFG: BitField = BitField::new("LPFP_CFG", 2, 3, "low-pass filter configuration");
    /// Output registers are not updated until both MSB and LSB have been read. Always written as 1.
    pub const BDU: BitField = BitField::new("BDU", 1, 2, "block data update");

    pub const FIELDS: [BitField; 4] = [Self::ODR, Self::EN_LPFP, Self::LPFP_CFG, Self::BDU];
}

/// CTRL_REG2 (0x11) fields
pub struct CtrlReg2;

impl CtrlReg2 {
    /// Reboot memory content
    pub const BOOT: BitField = BitField::new("BOOT", 7, 8, "reboot memory content");
    /// Register address auto increment on multi-byte access. Always written as 1.
    pub const IF_ADD_INC: BitField =
        BitField::new("IF_ADD_INC", 4, 5, "register address auto increment");
    /// Software reset
    pub const SWRESET: BitField = BitField::new("SWRESET", 2, 3, "software reset");
    /// Starts a single conversion while ODR is 0, cleared by the device when data is ready
    pub const ONE_SHOT: BitField = BitField::new("ONE_SHOT", 0, 1, "one-shot enable");

    pub const FIELDS: [BitField; 4] = [Self::BOOT, Self::IF_ADD_INC, Self::SWRESET, Self::ONE_SHOT];

    /// CTRL_REG2 value to write back over `current`: IF_ADD_INC always set, ONE_SHOT and
    /// SWRESET set on request, everything else kept.
    pub fn init_value(current: u8, one_shot: bool, sw_reset: bool) -> Result<u8, InvalidFieldValue> {
        let mut raw = current;
        if one_shot {
            raw = Self::ONE_SHOT.set_flag(raw, true)?;
        }
        if sw_reset {
            raw = Self::SWRESET.set_flag(raw, true)?;
        }
        Self::IF_ADD_INC.set_flag(raw, true)
    }
}


bitfield! {
    /// LPS3x STATUS bits
    pub struct Status(u8);
    impl Debug;

    pub bool, get_press_available, _: 0;  // new pressure data available
    pub bool, get_temp_available, _: 1;   // new temperature data available
    pub bool, get_press_overrun, _: 4;    // pressure data overwritten before read
    pub bool, get_temp_overrun, _: 5;     // temperature data overwritten before read
    // bits 7,6,3,2 not used
}

/// Snapshot of the STATUS register, read fresh on every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataStatus {
    pub temp_overrun: bool,
    pub pressure_overrun: bool,
    pub temp_available: bool,
    pub press_available: bool,
}

impl From<u8> for DataStatus {
    fn from(v: u8) -> Self {
        let status = Status(v);
        Self {
            temp_overrun: status.get_temp_overrun(),
            pressure_overrun: status.get_press_overrun(),
            temp_available: status.get_temp_available(),
            press_available: status.get_press_available(),
        }
    }
}

impl DataStatus {
    /// Which values can be read right now, `None` when nothing new is available.
    pub fn ready_measurement(&self) -> Option<Measurement> {
        match (self.press_available, self.temp_available) {
            (true, true) => Some(Measurement::PressureAndTemperature),
            (true, false) => Some(Measurement::Pressure),
            (false, true) => Some(Measurement::Temperature),
            (false, false) => None,
        }
    }
}


/// Which value(s) to fetch, numbered as the sensor's measurement index 1..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Measurement {
    Temperature = 1,
    Pressure = 2,
    PressureAndTemperature = 3,
    /// raw auto-zero pressure offset, unscaled
    PressureOffset = 4,
}

/// A measurement index outside 1..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMeasurementIndex(pub u8);

impl TryFrom<u8> for Measurement {
    type Error = InvalidMeasurementIndex;

    fn try_from(v: u8) -> Result<Self, InvalidMeasurementIndex> {
        match v {
            1 => Ok(Self::Temperature),
            2 => Ok(Self::Pressure),
            3 => Ok(Self::PressureAndTemperature),
            4 => Ok(Self::PressureOffset),
            _ => Err(InvalidMeasurementIndex(v)),
        }
    }
}

/// Values read for one [`Measurement`]; the ones not requested stay `None`
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct MeasuredValues {
    /// air pressure, hPa
    pub pressure: Option<f64>,
    /// temperature, degrees C
    pub temperature: Option<f64>,
    /// raw 24 bit auto-zero offset
    pub pressure_offset: Option<u32>,
}


/// Output Data Rate (ODR) config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Default)]
#[repr(u8)]
pub enum Odr {
    /// power down, conversions only on ONE_SHOT
    #[default]
    PowerDown = 0x00,
    Hz1 = 0x01,
    Hz10 = 0x02,
    Hz25 = 0x03,
    Hz50 = 0x04,
    Hz75 = 0x05,
}

impl Odr {
    pub fn hz(&self) -> u16 {
        match *self {
            Odr::PowerDown => 0,
            Odr::Hz1 => 1,
            Odr::Hz10 => 10,
            Odr::Hz25 => 25,
            Odr::Hz50 => 50,
            Odr::Hz75 => 75,
        }
    }
}

impl TryFrom<u8> for Odr {
    type Error = InvalidFieldValue;

    fn try_from(v: u8) -> Result<Self, InvalidFieldValue> {
        match v {
            0x00 => Ok(Self::PowerDown),
            0x01 => Ok(Self::Hz1),
            0x02 => Ok(Self::Hz10),
            0x03 => Ok(Self::Hz25),
            0x04 => Ok(Self::Hz50),
            0x05 => Ok(Self::Hz75),
            _ => Err(InvalidFieldValue::new(CtrlReg1::ODR.name(), v)),
        }
    }
}

/// output data rate in Hz for a raw ODR code
pub fn odr_hz(raw_odr: u8) -> Result<u16, InvalidFieldValue> {
    Ok(Odr::try_from(raw_odr)?.hz())
}

/// Time in ms between fresh samples for a raw ODR code, truncated (75 Hz gives 13 ms).
/// Power down / single-shot gives the single conversion time instead.
pub fn conversion_cycle_time_ms(raw_odr: u8) -> Result<u16, InvalidFieldValue> {
    match Odr::try_from(raw_odr)? {
        Odr::PowerDown => Ok(LPS3X_SINGLE_SHOT_CONVERSION_MS),
        odr => Ok(1_000 / odr.hz()),
    }
}


/// Low-pass filter on pressure data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LpfpConfig {
    pub enabled: bool,
    pub config: u8,
}

/// Logical view of CTRL_REG1, cached by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlConfig {
    /// raw ODR code 0..=5, 0 is single-shot
    pub output_data_rate: u8,
    pub lpfp_enabled: bool,
    /// 0..=1
    pub lpfp_config: u8,
    pub block_data_update: bool,
}

impl ControlConfig {
    /// decode a CTRL_REG1 byte
    pub fn from_register(raw: u8) -> Self {
        Self {
            output_data_rate: CtrlReg1::ODR.get(raw),
            lpfp_enabled: CtrlReg1::EN_LPFP.is_set(raw),
            lpfp_config: CtrlReg1::LPFP_CFG.get(raw),
            block_data_update: CtrlReg1::BDU.is_set(raw),
        }
    }

    /// Encode onto `current`, the CTRL_REG1 byte just read from the device. BDU is forced on
    /// whatever `block_data_update` says, multi-byte reads must never straddle two samples.
    pub fn to_register(&self, current: u8) -> Result<u8, InvalidFieldValue> {
        let mut raw = CtrlReg1::ODR.set(current, self.output_data_rate)?;
        raw = CtrlReg1::EN_LPFP.set_flag(raw, self.lpfp_enabled)?;
        raw = CtrlReg1::LPFP_CFG.set(raw, self.lpfp_config)?;
        CtrlReg1::BDU.set_flag(raw, true)
    }

    pub fn lpfp(&self) -> LpfpConfig {
        LpfpConfig {
            enabled: self.lpfp_enabled,
            config: self.lpfp_config,
        }
    }

    pub fn is_single_shot(&self) -> bool {
        self.output_data_rate == Odr::PowerDown as u8
    }
}


/// device model read from WHO_AM_I
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum DeviceModel {
    /// LPS33HW / LPS35HW
    Lps3x,
    Unknown(u8),
}

impl From<u8> for DeviceModel {
    fn from(v: u8) -> Self {
        match v {
            LPS3X_WHO_AM_I_VALUE => Self::Lps3x,
            other => Self::Unknown(other),
        }
    }
}


/// TEMP_OUT bytes to degrees C
pub fn temperature_from_bytes(buf: [u8; 2]) -> f64 {
    i16::from_le_bytes(buf) as f64 / LPS3X_TEMPERATURE_LSB_PER_C
}

/// 24 bit unsigned little endian value, as in PRESS_OUT and REF_P
pub fn raw_pressure_from_bytes(buf: [u8; 3]) -> u32 {
    buf[0] as u32 | ((buf[1] as u32) << 8) | ((buf[2] as u32) << 16)
}

/// raw PRESS_OUT value to hPa
pub fn pressure_from_raw(raw_pressure: u32) -> f64 {
    raw_pressure as f64 / LPS3X_PRESSURE_LSB_PER_HPA
}

/// Altitude in metres above the `sea_level_hpa` reference, international barometric formula.
pub fn pressure_altitude_m(pressure_hpa: f64, sea_level_hpa: f64) -> f64 {
    44_330.0 * (1.0 - pow(pressure_hpa / sea_level_hpa, 1.0 / 5.255))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "{} is not close to {}",
            actual,
            expected
        );
    }

    #[test]
    fn register_fields_do_not_overlap() {
        for fields in [CtrlReg1::FIELDS, CtrlReg2::FIELDS] {
            for (i, a) in fields.iter().enumerate() {
                for b in fields.iter().skip(i + 1) {
                    assert!(!a.overlaps(b), "{} overlaps {}", a.name(), b.name());
                }
            }
        }
    }

    #[test]
    fn ctrl_reg1_round_trip_every_valid_value() {
        for field in CtrlReg1::FIELDS {
            for value in 0..=field.max_value() {
                if field.check(value).is_err() {
                    continue;
                }
                for source in [0x00u8, 0xFF, 0xA5, 0x5A] {
                    let raw = field.set(source, value).unwrap();
                    assert_eq!(field.get(raw), value);
                    assert_eq!(raw & !field.mask(), source & !field.mask());
                }
            }
        }
    }

    #[test]
    fn odr_field_rejects_codes_above_five() {
        assert_eq!(
            CtrlReg1::ODR.set(0, 6),
            Err(InvalidFieldValue::new("ODR", 6))
        );
        assert!(CtrlReg1::ODR.set(0, 7).is_err());
        assert!(CtrlReg1::LPFP_CFG.set(0, 2).is_err());
    }

    #[test]
    fn odr_hz_table() {
        let expected = [0u16, 1, 10, 25, 50, 75];
        for (raw, hz) in expected.iter().enumerate() {
            assert_eq!(odr_hz(raw as u8), Ok(*hz));
        }
        assert_eq!(odr_hz(6), Err(InvalidFieldValue::new("ODR", 6)));
        assert!(odr_hz(0xFF).is_err());
    }

    #[test]
    fn conversion_cycle_time_truncates() {
        assert_eq!(conversion_cycle_time_ms(0), Ok(14));
        assert_eq!(conversion_cycle_time_ms(1), Ok(1000));
        assert_eq!(conversion_cycle_time_ms(2), Ok(100));
        assert_eq!(conversion_cycle_time_ms(3), Ok(40));
        assert_eq!(conversion_cycle_time_ms(4), Ok(20));
        assert_eq!(conversion_cycle_time_ms(5), Ok(13));
        assert!(conversion_cycle_time_ms(6).is_err());
    }

    #[test]
    fn pressure_decode() {
        let raw = raw_pressure_from_bytes([0x00, 0x00, 0x10]);
        assert_eq!(raw, 1_048_576);
        assert_close(pressure_from_raw(raw), 256.0);
        assert_eq!(raw_pressure_from_bytes([0x01, 0x02, 0x03]), 0x03_02_01);
        assert_eq!(raw_pressure_from_bytes([0xFF, 0xFF, 0xFF]), 0x00FF_FFFF);
    }

    #[test]
    fn temperature_decode() {
        assert_close(temperature_from_bytes([0xE8, 0x03]), 10.0);
        assert_close(temperature_from_bytes([0x18, 0xFC]), -10.0);
        assert_close(temperature_from_bytes([0x00, 0x00]), 0.0);
    }

    #[test]
    fn status_decode() {
        assert_eq!(
            DataStatus::from(0x33u8),
            DataStatus {
                temp_overrun: true,
                pressure_overrun: true,
                temp_available: true,
                press_available: true,
            }
        );
        assert_eq!(DataStatus::from(0x00u8), DataStatus::default());
        let status = DataStatus::from(0x20u8);
        assert!(status.temp_overrun);
        assert!(!status.pressure_overrun && !status.temp_available && !status.press_available);
    }

    #[test]
    fn ready_measurement_follows_available_flags() {
        assert_eq!(
            DataStatus::from(0x03u8).ready_measurement(),
            Some(Measurement::PressureAndTemperature)
        );
        assert_eq!(
            DataStatus::from(0x01u8).ready_measurement(),
            Some(Measurement::Pressure)
        );
        assert_eq!(
            DataStatus::from(0x02u8).ready_measurement(),
            Some(Measurement::Temperature)
        );
        // overrun alone is not data
        assert_eq!(DataStatus::from(0x30u8).ready_measurement(), None);
    }

    #[test]
    fn measurement_index() {
        assert_eq!(Measurement::try_from(1u8), Ok(Measurement::Temperature));
        assert_eq!(Measurement::try_from(4u8), Ok(Measurement::PressureOffset));
        assert_eq!(Measurement::try_from(0u8), Err(InvalidMeasurementIndex(0)));
        assert_eq!(Measurement::try_from(5u8), Err(InvalidMeasurementIndex(5)));
    }

    #[test]
    fn control_config_decode() {
        let config = ControlConfig::from_register(0b0101_1110);
        assert_eq!(
            config,
            ControlConfig {
                output_data_rate: 5,
                lpfp_enabled: true,
                lpfp_config: 1,
                block_data_update: true,
            }
        );
        assert_eq!(config.lpfp(), LpfpConfig { enabled: true, config: 1 });
        assert!(!config.is_single_shot());
        assert!(ControlConfig::from_register(0x00).is_single_shot());
    }

    #[test]
    fn control_config_encode_forces_bdu_and_keeps_unmodelled_bits() {
        let config = ControlConfig {
            output_data_rate: 3,
            lpfp_enabled: false,
            lpfp_config: 0,
            block_data_update: false,
        };
        // SIM (bit 0) and bit 7 come from the device and must survive
        assert_eq!(config.to_register(0b1111_1111).unwrap(), 0b1011_0011);
        assert_eq!(config.to_register(0x00).unwrap(), 0b0011_0010);
    }

    #[test]
    fn control_config_encode_rejects_bad_odr() {
        let config = ControlConfig {
            output_data_rate: 6,
            ..Default::default()
        };
        assert_eq!(
            config.to_register(0x00),
            Err(InvalidFieldValue::new("ODR", 6))
        );
    }

    #[test]
    fn ctrl_reg2_init_value() {
        assert_eq!(CtrlReg2::init_value(0x00, false, false), Ok(0x10));
        assert_eq!(CtrlReg2::init_value(0x00, true, false), Ok(0x11));
        assert_eq!(CtrlReg2::init_value(0x00, false, true), Ok(0x14));
        assert_eq!(CtrlReg2::init_value(0x80, true, true), Ok(0x95));
    }

    #[test]
    fn device_model() {
        assert_eq!(DeviceModel::from(0xB1u8), DeviceModel::Lps3x);
        assert_eq!(DeviceModel::from(0xB3u8), DeviceModel::Unknown(0xB3));
    }

    #[test]
    fn altitude() {
        assert_close(pressure_altitude_m(1013.25, 1013.25), 0.0);
        let altitude = pressure_altitude_m(899.0, 1013.25);
        assert!(altitude > 990.0 && altitude < 1010.0, "{}", altitude);
    }
}
