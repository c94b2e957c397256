// LPS3x registers

#![allow(nonstandard_style)]
pub const LPS3X_REG_WHO_AM_I: u8 = 0x0F;  // device identification, read only, expect 0xB1
pub const LPS3X_REG_CTRL_REG1: u8 = 0x10;  // ODR, low-pass filter and block data update
pub const LPS3X_REG_CTRL_REG2: u8 = 0x11;  // BOOT, IF_ADD_INC, SWRESET, ONE_SHOT
pub const LPS3X_REG_REF_P: u8 = 0x15;  // 3 bytes at 0x15 - 0x17, 24 bit auto-zero pressure offset, little endian
pub const LPS3X_REG_STATUS: u8 = 0x27;  // overrun and data available flags
pub const LPS3X_REG_PRESS_OUT: u8 = 0x28;  // 3 bytes at 0x28 - 0x2a, 24 bit pressure, little endian
pub const LPS3X_REG_TEMP_OUT: u8 = 0x2B;  // 2 bytes at 0x2b - 0x2c, signed 16 bit temperature, little endian

pub const LPS3X_WHO_AM_I_VALUE: u8 = 0xB1;

pub const LPS3X_PRESSURE_LSB_PER_HPA: f64 = 4096.0;
pub const LPS3X_TEMPERATURE_LSB_PER_C: f64 = 100.0;

/// shortest wait for a single-shot conversion, measured rather than taken from the datasheet
pub const LPS3X_SINGLE_SHOT_CONVERSION_MS: u16 = 14;


#[repr(u8)]
/// LPS3x I2C device address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAddress {
    /// SA0 pulled high, the only address this driver accepts
    Primary = 0x5D,
}

impl From<DeviceAddress> for u8 {
    fn from(value: DeviceAddress) -> Self {
        match value {
            DeviceAddress::Primary => 0x5D,
        }
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = ();

    fn try_from(value: u8) -> Result<DeviceAddress, ()> {
        match value {
            0x5D => Ok(DeviceAddress::Primary),
            _ => Err(()),
        }
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self::Primary
    }
}
