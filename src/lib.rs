//! `no_std` driver for the ST LPS3x (LPS33HW / LPS35HW) MEMS barometric pressure and
//! temperature sensor over embedded-hal 1.0 I2C.
//!
//! ```ignore
//! let mut sensor = LPS3x::new(i2c, DeviceAddress::Primary.into())?;
//! sensor.init_device()?;
//! sensor.start_measurement(true, Odr::Hz1 as u8)?;
//! let wait_ms = sensor.get_conversion_cycle_time()?;
//! loop {
//!     delay.delay_ms(wait_ms as u32);
//!     if let Some(values) = sensor.next_measurement()? {
//!         info!("{:?}", values);
//!     }
//! }
//! ```
//!
//! The driver assumes it is the only user of the sensor; calls are blocking and must not be
//! interleaved from several contexts.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod constants;
pub mod data;
pub mod error;
pub mod field;

use embedded_hal::i2c::I2c;
use log::debug;

use crate::constants::{
    DeviceAddress, LPS3X_REG_CTRL_REG1, LPS3X_REG_CTRL_REG2, LPS3X_REG_PRESS_OUT,
    LPS3X_REG_REF_P, LPS3X_REG_STATUS, LPS3X_REG_TEMP_OUT, LPS3X_REG_WHO_AM_I,
};
use crate::data::{
    conversion_cycle_time_ms, pressure_from_raw, raw_pressure_from_bytes, temperature_from_bytes,
    ControlConfig, CtrlReg2, DataStatus, DeviceModel, LpfpConfig, MeasuredValues, Measurement, Odr,
};
use crate::error::Error;


/// the LPS3x device
pub struct LPS3x<I2C> {
    /// I²C interface
    i2c: I2C,
    /// I²C device address
    address: u8,
    /// CTRL_REG1 as last read back from the device
    config: ControlConfig,
}

impl<I2C, E> LPS3x<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new LPS3x driver. Only the 0x5D address is accepted. No bus traffic happens
    /// until [`LPS3x::init_device`].
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        debug!("new called, address {:#x}", address);
        if DeviceAddress::try_from(address).is_err() {
            return Err(Error::InvalidArgument("LPS3x device address must be 0x5D"));
        }
        Ok(Self {
            i2c,
            address,
            config: ControlConfig::default(),
        })
    }

    /// give back the I2C interface
    pub fn release(self) -> I2C {
        self.i2c
    }

    // command_buf is an u8 array that starts with the register address followed by data byte(s)
    fn write_command<const N: usize>(&mut self, command_buf: [u8; N]) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &command_buf)
            .map_err(Error::I2c)?;
        Ok(())
    }

    // multi-byte reads rely on IF_ADD_INC, see init_ctrl_reg2
    fn read_register(&mut self, register_address: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        let command_buffer = [register_address];
        self.i2c
            .write_read(self.address, &command_buffer, buffer)
            .map_err(Error::I2c)?;
        Ok(())
    }

    fn read_reg_8bit(&mut self, register_address: u8) -> Result<u8, Error<E>> {
        let mut result_buf: [u8; 1] = [0; 1];
        self.read_register(register_address, &mut result_buf)?;
        Ok(result_buf[0])
    }

    fn write_reg_8bit(&mut self, register_address: u8, value: u8) -> Result<(), Error<E>> {
        self.write_command([register_address, value])
    }

    /// Sync the cached configuration from CTRL_REG1 and set CTRL_REG2 defaults
    /// (register address auto increment on).
    pub fn init_device(&mut self) -> Result<(), Error<E>> {
        debug!("in init_device()");
        self.raw_config_to_properties()?;
        self.init_ctrl_reg2(false, false)
    }

    // IF_ADD_INC is always written as 1, multi-byte reads depend on it
    fn init_ctrl_reg2(&mut self, one_shot: bool, sw_reset: bool) -> Result<(), Error<E>> {
        let raw = self.read_reg_8bit(LPS3X_REG_CTRL_REG2)?;
        let value = CtrlReg2::init_value(raw, one_shot, sw_reset)?;
        debug!("  writing CTRL_REG2 {:#b} (was {:#b})", value, raw);
        self.write_reg_8bit(LPS3X_REG_CTRL_REG2, value)
    }

    /// read WHO_AM_I
    pub fn get_id(&mut self) -> Result<u8, Error<E>> {
        self.read_reg_8bit(LPS3X_REG_WHO_AM_I)
    }

    /// read device model
    pub fn device_model(&mut self) -> Result<DeviceModel, Error<E>> {
        Ok(DeviceModel::from(self.get_id()?))
    }

    /// LPS3x soft reset
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        debug!("in soft_reset()");
        let raw = self.read_reg_8bit(LPS3X_REG_CTRL_REG2)?;
        let value = CtrlReg2::SWRESET.set_flag(raw, true)?;
        self.write_reg_8bit(LPS3X_REG_CTRL_REG2, value)
    }

    /// get STATUS, never cached
    pub fn get_data_status(&mut self) -> Result<DataStatus, Error<E>> {
        let raw = self.read_reg_8bit(LPS3X_REG_STATUS)?;
        debug!("  STATUS = {:#b}", raw);
        Ok(DataStatus::from(raw))
    }

    /// read temperature in degrees C
    pub fn read_temperature(&mut self) -> Result<f64, Error<E>> {
        let mut result_buf: [u8; 2] = [0; 2];
        self.read_register(LPS3X_REG_TEMP_OUT, &mut result_buf)?;
        Ok(temperature_from_bytes(result_buf))
    }

    /// read air pressure in hPa
    pub fn read_pressure(&mut self) -> Result<f64, Error<E>> {
        let mut result_buf: [u8; 3] = [0; 3];
        self.read_register(LPS3X_REG_PRESS_OUT, &mut result_buf)?;
        let raw_pressure = raw_pressure_from_bytes(result_buf);
        debug!("  raw_pressure = {}", raw_pressure);
        Ok(pressure_from_raw(raw_pressure))
    }

    /// read the raw 24 bit auto-zero pressure offset, unscaled
    pub fn read_pressure_offset(&mut self) -> Result<u32, Error<E>> {
        let mut result_buf: [u8; 3] = [0; 3];
        self.read_register(LPS3X_REG_REF_P, &mut result_buf)?;
        Ok(raw_pressure_from_bytes(result_buf))
    }

    /// Read the value(s) selected by `measurement`. Pressure is read before temperature.
    pub fn get_measurement_value(
        &mut self,
        measurement: Measurement,
    ) -> Result<MeasuredValues, Error<E>> {
        debug!("in get_measurement_value({:?})", measurement);
        let values = match measurement {
            Measurement::Temperature => MeasuredValues {
                temperature: Some(self.read_temperature()?),
                ..Default::default()
            },
            Measurement::Pressure => MeasuredValues {
                pressure: Some(self.read_pressure()?),
                ..Default::default()
            },
            Measurement::PressureAndTemperature => {
                let pressure = self.read_pressure()?;
                let temperature = self.read_temperature()?;
                MeasuredValues {
                    pressure: Some(pressure),
                    temperature: Some(temperature),
                    pressure_offset: None,
                }
            }
            Measurement::PressureOffset => MeasuredValues {
                pressure_offset: Some(self.read_pressure_offset()?),
                ..Default::default()
            },
        };
        Ok(values)
    }

    /// [`LPS3x::get_measurement_value`] keyed by the numeric index 1..=4 (1 temperature,
    /// 2 pressure, 3 both, 4 pressure offset). Other indexes are an `InvalidArgument`.
    pub fn get_measurement_value_by_index(&mut self, index: u8) -> Result<MeasuredValues, Error<E>> {
        let measurement = Measurement::try_from(index)?;
        self.get_measurement_value(measurement)
    }

    /// Conversion time in ms for the cached ODR. Call again after every
    /// [`LPS3x::start_measurement`].
    pub fn get_conversion_cycle_time(&self) -> Result<u16, Error<E>> {
        Ok(conversion_cycle_time_ms(self.config.output_data_rate)?)
    }

    /// Configure the data rate and start measuring.
    ///
    /// `continuous_mode` needs a non-zero `raw_odr` (1..=5); single-shot needs `raw_odr == 0`
    /// and triggers one conversion. Arguments are checked before any register is written.
    /// CTRL_REG1 is written before CTRL_REG2; if the second write fails the new data rate is
    /// already active and is not rolled back.
    pub fn start_measurement(&mut self, continuous_mode: bool, raw_odr: u8) -> Result<(), Error<E>> {
        debug!("in start_measurement({}, {})", continuous_mode, raw_odr);
        if continuous_mode && raw_odr == 0 {
            return Err(Error::InvalidArgument("ODR must be nonzero in continuous mode"));
        }
        if !continuous_mode && raw_odr != 0 {
            return Err(Error::InvalidArgument("ODR must be zero in single-shot mode"));
        }
        let odr = Odr::try_from(raw_odr)?;

        // the cache only changes through the final read back
        let mut config = self.config;
        config.output_data_rate = odr as u8;
        let current = self.read_reg_8bit(LPS3X_REG_CTRL_REG1)?;
        let raw_cfg_1 = config.to_register(current)?;
        debug!("  writing CTRL_REG1 {:#b}", raw_cfg_1);
        self.write_reg_8bit(LPS3X_REG_CTRL_REG1, raw_cfg_1)?;
        self.init_ctrl_reg2(!continuous_mode, false)?;
        // read back what the device actually accepted
        self.raw_config_to_properties()
    }

    /// decode CTRL_REG1 into the cached configuration
    pub fn raw_config_to_properties(&mut self) -> Result<(), Error<E>> {
        let raw = self.read_reg_8bit(LPS3X_REG_CTRL_REG1)?;
        self.config = ControlConfig::from_register(raw);
        debug!("  CTRL_REG1 {:#b} -> {:?}", raw, self.config);
        Ok(())
    }

    /// CTRL_REG1 value for the cached configuration, built over a fresh read of the register
    /// so unmodelled bits survive. Nothing is written.
    pub fn properties_to_raw_config(&mut self) -> Result<u8, Error<E>> {
        let current = self.read_reg_8bit(LPS3X_REG_CTRL_REG1)?;
        Ok(self.config.to_register(current)?)
    }

    /// cached CTRL_REG1 configuration
    pub fn control_config(&self) -> ControlConfig {
        self.config
    }

    /// raw output data rate 0..=5, 0 being power down / single-shot
    pub fn output_data_rate(&self) -> u8 {
        self.config.output_data_rate
    }

    /// true when the cached ODR is 0 (power down, conversions on ONE_SHOT only)
    pub fn is_single_shot_mode(&self) -> bool {
        self.config.is_single_shot()
    }

    /// true when the cached ODR is 1..=5
    pub fn is_continuous_mode(&self) -> bool {
        !self.is_single_shot_mode()
    }

    /// low-pass filter configuration
    pub fn lpfp_config(&self) -> LpfpConfig {
        self.config.lpfp()
    }

    /// One polling step in continuous mode: read STATUS and fetch whatever is available.
    ///
    /// Returns `Ok(None)` when no new data is ready, and always in single-shot mode, where
    /// values must be fetched with [`LPS3x::get_measurement_value`]. Never blocks; the caller
    /// paces calls with [`LPS3x::get_conversion_cycle_time`].
    pub fn next_measurement(&mut self) -> Result<Option<MeasuredValues>, Error<E>> {
        if self.is_single_shot_mode() {
            return Ok(None);
        }
        let status = self.get_data_status()?;
        match status.ready_measurement() {
            Some(measurement) => Ok(Some(self.get_measurement_value(measurement)?)),
            None => {
                debug!("  LPS3x data not ready");
                Ok(None)
            }
        }
    }

    /// Endless iterator of [`LPS3x::next_measurement`] results.
    pub fn measurements(&mut self) -> Measurements<'_, I2C> {
        Measurements { sensor: self }
    }
}

/// Iterator returned by [`LPS3x::measurements`]; it never ends.
pub struct Measurements<'a, I2C> {
    sensor: &'a mut LPS3x<I2C>,
}

impl<I2C, E> Iterator for Measurements<'_, I2C>
where
    I2C: I2c<Error = E>,
{
    type Item = Result<Option<MeasuredValues>, Error<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.sensor.next_measurement())
    }
}
