use core::fmt;

use crate::data::InvalidMeasurementIndex;
use crate::field::InvalidFieldValue;

/// All possible errors
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error<E> {
    /// I²C bus error
    I2c(E),
    /// an argument was rejected before any register was written
    InvalidArgument(&'static str),
    /// a register field was given a value outside its width or valid set
    InvalidFieldValue(InvalidFieldValue),
}

impl<E> From<InvalidFieldValue> for Error<E> {
    fn from(err: InvalidFieldValue) -> Self {
        Error::InvalidFieldValue(err)
    }
}

impl<E> From<InvalidMeasurementIndex> for Error<E> {
    fn from(_: InvalidMeasurementIndex) -> Self {
        Error::InvalidArgument("measurement index must be 1..=4")
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C bus error: {:?}", e),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::InvalidFieldValue(err) => write!(f, "{}", err),
        }
    }
}
