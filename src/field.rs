//! Bit field codec for 8-bit register images.
//!
//! A [`BitField`] names a run of bits `start..end` inside one register byte. Reads shift the
//! bits down to position 0; writes validate the value and replace only the field's bits, so a
//! register image read from the device can be edited field by field and written back whole.

use core::fmt;

/// Values a field accepts on write, on top of what its width already allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidValues {
    /// any value in `start..end`
    Span { start: u8, end: u8 },
    /// one of the listed values
    Set(&'static [u8]),
}

impl ValidValues {
    pub fn contains(&self, value: u8) -> bool {
        match *self {
            ValidValues::Span { start, end } => value >= start && value < end,
            ValidValues::Set(values) => values.contains(&value),
        }
    }
}

/// A named field occupying bits `start..end` (end exclusive) of an 8-bit register.
/// Built only through [`BitField::new`], so `start < end <= 8` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    name: &'static str,
    start: u8,
    end: u8,
    valid_values: Option<ValidValues>,
    description: &'static str,
}

impl BitField {
    /// Bit ranges are checked at compile time when used in a `const`.
    pub const fn new(name: &'static str, start: u8, end: u8, description: &'static str) -> Self {
        assert!(start < end && end <= 8, "bit field must lie within 0..8");
        Self {
            name,
            start,
            end,
            valid_values: None,
            description,
        }
    }

    pub const fn with_valid_values(self, valid_values: ValidValues) -> Self {
        Self {
            valid_values: Some(valid_values),
            ..self
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// lowest bit of the field
    pub const fn start(&self) -> u8 {
        self.start
    }

    /// one past the highest bit of the field
    pub const fn end(&self) -> u8 {
        self.end
    }

    pub const fn valid_values(&self) -> Option<ValidValues> {
        self.valid_values
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn width(&self) -> u8 {
        self.end - self.start
    }

    /// largest value the field can hold
    pub const fn max_value(&self) -> u8 {
        0xFF >> (8 - self.width())
    }

    /// the field's bits, in register position
    pub const fn mask(&self) -> u8 {
        self.max_value() << self.start
    }

    pub const fn overlaps(&self, other: &BitField) -> bool {
        self.mask() & other.mask() != 0
    }

    /// Extract the field from `source`, shifted down to bit 0.
    pub fn get(&self, source: u8) -> u8 {
        (source & self.mask()) >> self.start
    }

    pub fn is_set(&self, source: u8) -> bool {
        self.get(source) != 0
    }

    pub fn check(&self, value: u8) -> Result<(), InvalidFieldValue> {
        let in_width = value <= self.max_value();
        let in_set = self.valid_values.map_or(true, |valid| valid.contains(value));
        if in_width && in_set {
            Ok(())
        } else {
            Err(InvalidFieldValue::new(self.name, value))
        }
    }

    /// Return `source` with the field replaced by `value`, all other bits untouched.
    pub fn set(&self, source: u8, value: u8) -> Result<u8, InvalidFieldValue> {
        self.check(value)?;
        Ok((source & !self.mask()) | (value << self.start))
    }

    pub fn set_flag(&self, source: u8, value: bool) -> Result<u8, InvalidFieldValue> {
        self.set(source, value as u8)
    }
}

/// A value rejected by [`BitField::set`] or by a lookup keyed on a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidFieldValue {
    pub field: &'static str,
    pub value: u8,
}

impl InvalidFieldValue {
    pub fn new(field: &'static str, value: u8) -> Self {
        Self { field, value }
    }
}

impl fmt::Display for InvalidFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {} for field {}", self.value, self.field)
    }
}
