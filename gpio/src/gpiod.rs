//! Backend for the Linux GPIO character device (`/dev/gpiochipN`), through the gpiod library.
//!
//! Lines are requested from the kernel when a pin becomes an input or an output, and
//! given back when that handle is dropped.
use crate::{GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: BitVec::repeat(false, n),
        }
    }

    /// Opens the chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: &Path) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path)?;
        debug!("Opened {} ({} lines)", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(GpiodPin {
            driver: self,
            pin_index: index,
            bias: GpioBias::None,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

impl From<GpioDriveMode> for gpiod::Drive {
    fn from(mode: GpioDriveMode) -> Self {
        match mode {
            GpioDriveMode::PushPull => gpiod::Drive::PushPull,
            GpioDriveMode::OpenDrain => gpiod::Drive::OpenDrain,
            GpioDriveMode::OpenSource => gpiod::Drive::OpenSource,
        }
    }
}

/// A claimed line. The kernel only sees the bias and drive mode once the line is requested.
struct GpiodPin<'a> {
    driver: &'a GpiodDriver,
    pin_index: usize,
    bias: GpioBias,
    drive_mode: GpioDriveMode,
}

impl Debug for GpiodPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for GpiodPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::input([self.pin_index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodInput { pin: self, line }))
    }

    fn as_output(&mut self, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::output([self.pin_index as u32])
                .values([initial])
                .consumer(env!("CARGO_PKG_NAME"))
                .bias(self.bias.into())
                .drive(self.drive_mode.into()),
        )?;
        Ok(Box::new(GpiodOutput { pin: self, line }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }

    fn supports_drive_mode(&self) -> bool {
        true
    }

    fn drive_mode(&self) -> GpioDriveMode {
        self.drive_mode
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl Drop for GpiodPin<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct GpiodInput<'a> {
    pin: &'a GpiodPin<'a>,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for GpiodInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        let [value] = self.line.get_values([false])?;
        Ok(value)
    }
}

struct GpiodOutput<'a> {
    pin: &'a GpiodPin<'a>,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}
