pub mod gpiod;
pub mod raw;
pub mod mock;
pub mod delay;
pub mod debounce;
pub mod keypad;

use std::fmt::Debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("pin {0} is assigned more than once")]
    DuplicatePin(usize),
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO pin at the given index.
    ///
    /// The pin is reset to a floating input and stays claimed until the returned handle is dropped.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the pin is already claimed.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;
}

/// Specifies which electrical level means "asserted".
///
/// For a matrix keypad this is both the level a row driver puts out to select its row
/// and the level a column reads while a key in the selected row is held down.
///
/// By default, the active level is high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the real state that will be outputted on the GPIO pin based on the active level and the value.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }

    /// The physical level of an asserted line.
    pub fn asserted(&self) -> bool {
        self.get_state(true)
    }

    /// The physical level of a released line.
    pub fn released(&self) -> bool {
        self.get_state(false)
    }

    /// Whether the given physical level counts as asserted.
    pub fn is_asserted(&self, level: bool) -> bool {
        level == self.asserted()
    }

    /// The bias that holds an undriven input at the released level.
    pub fn idle_bias(&self) -> GpioBias {
        match self {
            GpioActiveLevel::High => GpioBias::PullDown,
            GpioActiveLevel::Low => GpioBias::PullUp,
        }
    }
}

/// Specifies the bias of the GPIO pin.
///
/// You can use this to enable pull-up or pull-down resistors.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// Specifies the drive mode of the GPIO pin.
///
/// Works only in output mode.
///
/// By default, the drive mode is push-pull, which drives the pin high or low with low impedance.
/// There's also open-drain and open-source modes, that leave the pin floating when the output is high or low, respectively.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpioDriveMode {
    /// GPIO pin is driven high or low with low impedance.
    #[default] PushPull,
    /// GPIO pin is driven low or left floating when high.
    OpenDrain,
    /// GPIO pin is driven high or left floating when low.
    OpenSource,
}

impl GpioDriveMode {
    /// Gets the real state that will be outputted on the GPIO pin based on the drive mode and the value.
    ///
    /// # Returns
    /// - `Some(true)` if the pin will be driven high.
    /// - `Some(false)` if the pin will be driven low.
    /// - `None` if the pin will be left floating.
    pub fn get_state(&self, value: bool) -> Option<bool> {
        match self {
            GpioDriveMode::PushPull => Some(value),
            GpioDriveMode::OpenDrain => if value { None } else { Some(false) },
            GpioDriveMode::OpenSource => if value { Some(true) } else { None },
        }
    }
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to input, allowing reading its state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Sets the GPIO pin function to output, allowing writing its state.
    ///
    /// The line is set to `initial` before it starts driving, so it never shows another level.
    fn as_output(&mut self, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Gets whether the GPIO pin supports bias (pull-up/pull-down resistors).
    fn supports_bias(&self) -> bool {
        false
    }
    /// Gets the bias of the GPIO pin.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Gets whether the GPIO pin supports drive mode (push-pull, open-drain, open-source).
    fn supports_drive_mode(&self) -> bool {
        false
    }
    /// Gets the drive mode of the GPIO pin.
    fn drive_mode(&self) -> GpioDriveMode {
        GpioDriveMode::PushPull
    }
    /// Sets the drive mode of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support drive mode.
    fn set_drive_mode(&mut self, _mode: GpioDriveMode) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

/// An input line. Reads return the raw physical level, with no inversion or filtering.
pub trait GpioInput: Debug {
    /// Reads the state of the GPIO pin.
    fn read(&self) -> GpioResult<bool>;
}

/// An output line. Writes set the raw physical level, subject to the pin's drive mode.
pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_low_asserts_low_and_pulls_up() {
        let level = GpioActiveLevel::Low;
        assert!(!level.asserted());
        assert!(level.released());
        assert!(level.is_asserted(false));
        assert!(!level.is_asserted(true));
        assert_eq!(level.idle_bias(), GpioBias::PullUp);
    }

    #[test]
    fn active_high_asserts_high_and_pulls_down() {
        let level = GpioActiveLevel::High;
        assert!(level.asserted());
        assert!(level.is_asserted(true));
        assert_eq!(level.idle_bias(), GpioBias::PullDown);
    }

    #[test]
    fn open_drain_floats_high() {
        assert_eq!(GpioDriveMode::OpenDrain.get_state(true), None);
        assert_eq!(GpioDriveMode::OpenDrain.get_state(false), Some(false));
        assert_eq!(GpioDriveMode::PushPull.get_state(true), Some(true));
    }
}
