//! Register-level backend for the BCM283x/BCM2711 GPIO block, mapped from `/dev/gpiomem` or `/dev/mem`.

use crate::{GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// A register bank where every pin owns a `width`-bit field.
#[derive(Copy, Clone, Debug)]
struct Bank {
    offset: usize,
    width: usize,
}

impl Bank {
    const GPFSEL: Bank = Bank { offset: 0x00, width: 3 };
    const GPSET: Bank = Bank { offset: 0x1C, width: 1 };
    const GPCLR: Bank = Bank { offset: 0x28, width: 1 };
    const GPLEV: Bank = Bank { offset: 0x34, width: 1 };
    const GPIO_PUP_PDN_CNTRL: Bank = Bank { offset: 0xE4, width: 2 };

    /// The word index and bit shift of a pin's field.
    fn locate(&self, pin_index: usize) -> (usize, usize) {
        let per_register = 32 / self.width;
        (self.offset / 4 + pin_index / per_register, (pin_index % per_register) * self.width)
    }

    fn mask(&self) -> u32 {
        (1 << self.width) - 1
    }
}

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u64 = 0x3F20_0000;
    const MAP_LEN: usize = 4096;
    const PIN_COUNT: usize = 58;

    const FUNCTION_INPUT: u32 = 0b000;
    const FUNCTION_OUTPUT: u32 = 0b001;

    fn open(path: &str) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(Self::GPIO_BASE)
            .len(Self::MAP_LEN)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::open("/dev/gpiomem")
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::open("/dev/mem")
    }

    fn check(pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    fn word(&self, index: usize) -> *mut u32 {
        debug_assert!(index * 4 < Self::MAP_LEN);
        // SAFETY: every bank lies within the mapped page, and `check` bounds the pin index.
        unsafe { (self.mmap.as_mut_ptr() as *mut u32).add(index) }
    }

    fn read_field(&self, bank: Bank, pin_index: usize) -> GpioResult<u32> {
        Self::check(pin_index)?;
        let (index, shift) = bank.locate(pin_index);
        let value = unsafe { self.word(index).read_volatile() };
        Ok((value >> shift) & bank.mask())
    }

    fn write_field(&self, bank: Bank, pin_index: usize, value: u32) -> GpioResult<()> {
        Self::check(pin_index)?;
        if value > bank.mask() {
            return Err(GpioError::InvalidArgument);
        }
        let (index, shift) = bank.locate(pin_index);
        let word = self.word(index);
        unsafe {
            let mut current = word.read_volatile();
            current &= !(bank.mask() << shift);
            current |= value << shift;
            word.write_volatile(current);
        }
        Ok(())
    }

    /// Sets the function select bits of a pin (0 = input, 1 = output, others = alternate functions).
    pub fn set_pin_function(&self, pin_index: usize, function: u32) -> GpioResult<()> {
        self.write_field(Bank::GPFSEL, pin_index, function)
    }

    fn set_level(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check(pin_index)?;
        // GPSET/GPCLR only act on the bits written as 1, no read-modify-write needed
        let bank = if high { Bank::GPSET } else { Bank::GPCLR };
        let (index, shift) = bank.locate(pin_index);
        unsafe { self.word(index).write_volatile(1 << shift) };
        Ok(())
    }

    fn level(&self, pin_index: usize) -> GpioResult<bool> {
        Ok(self.read_field(Bank::GPLEV, pin_index)? != 0)
    }

    fn drive(&self, pin_index: usize, value: bool, mode: GpioDriveMode) -> GpioResult<()> {
        match mode.get_state(value) {
            Some(level) => {
                self.set_level(pin_index, level)?;
                self.set_pin_function(pin_index, Self::FUNCTION_OUTPUT)?;
            }
            None => self.set_pin_function(pin_index, Self::FUNCTION_INPUT)?,
        }
        trace!("Pin {} driven {} ({:?})", pin_index, value, mode);
        Ok(())
    }

    fn set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        let value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };
        self.write_field(Bank::GPIO_PUP_PDN_CNTRL, pin_index, value)
    }

    fn bias(&self, pin_index: usize) -> GpioResult<GpioBias> {
        match self.read_field(Bank::GPIO_PUP_PDN_CNTRL, pin_index)? {
            0b00 => Ok(GpioBias::None),
            0b01 => Ok(GpioBias::PullUp),
            0b10 => Ok(GpioBias::PullDown),
            _ => Err(GpioError::NotSupported),
        }
    }

    fn reset(&self, pin_index: usize) -> GpioResult<()> {
        self.set_pin_function(pin_index, Self::FUNCTION_INPUT)?;
        self.set_bias(pin_index, GpioBias::None)?;
        self.set_level(pin_index, false)?;
        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        Self::check(index)?;

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        self.reset(index)?;

        Ok(Box::new(RawGpioPin {
            driver: self,
            pin_index: index,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
    drive_mode: GpioDriveMode,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.set_pin_function(self.pin_index, RawGpioDriver::FUNCTION_INPUT)?;
        Ok(Box::new(RawGpioInput { pin: self }))
    }

    fn as_output(&mut self, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>> {
        // Latches the level before the function switch; floating open drain/source pins stay inputs
        self.driver.drive(self.pin_index, initial, self.drive_mode)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.driver.bias(self.pin_index).unwrap_or(GpioBias::None)
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.set_bias(self.pin_index, bias)
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

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        _ = self.driver.reset(self.pin_index);
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct RawGpioInput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for RawGpioInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        self.pin.driver.level(self.pin.pin_index)
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.drive(self.pin.pin_index, value, self.pin.drive_mode)
    }
}
