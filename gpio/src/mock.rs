//! An in-memory GPIO driver with a simulated key matrix, and a clock that only moves when told to.
//!
//! Used by the tests, and by the app for dry runs without hardware.

use crate::delay::Delay;
use crate::keypad::PinAssignment;
use crate::{GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;
use std::time::Duration;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum MockFunction {
    #[default] Input,
    Output,
}

#[derive(Copy, Clone, Debug, Default)]
struct MockLine {
    function: MockFunction,
    bias: GpioBias,
    drive_mode: GpioDriveMode,
    value: bool,
}

impl MockLine {
    fn driven(&self) -> Option<bool> {
        match self.function {
            MockFunction::Output => self.drive_mode.get_state(self.value),
            MockFunction::Input => None,
        }
    }
}

/// A fake GPIO chip.
///
/// Pressing a key closes a contact between two pins. An undriven pin reads its pull level, unless
/// a pin on the other side of one of its contacts drives the opposite level. Press order never
/// matters. Floating pins read low.
pub struct MockGpioDriver {
    lines: RefCell<Vec<MockLine>>,
    used_pins: BitVec<AtomicU8>,
    contacts: RefCell<Vec<(usize, usize)>>,
    peaks: Cell<[usize; 2]>,
}

impl MockGpioDriver {
    pub fn new(count: usize) -> Self {
        Self {
            lines: RefCell::new(vec![MockLine::default(); count]),
            used_pins: BitVec::repeat(false, count),
            contacts: RefCell::new(Vec::new()),
            peaks: Cell::new([0; 2]),
        }
    }

    /// Closes the contact between two pins.
    pub fn press(&self, a: usize, b: usize) {
        let mut contacts = self.contacts.borrow_mut();
        if !contacts.iter().any(|&contact| contact == (a, b) || contact == (b, a)) {
            contacts.push((a, b));
        }
    }

    /// Opens the contact between two pins.
    pub fn release(&self, a: usize, b: usize) {
        self.contacts.borrow_mut().retain(|&contact| contact != (a, b) && contact != (b, a));
    }

    pub fn release_all(&self) {
        self.contacts.borrow_mut().clear();
    }

    /// Presses the keypad key at `(row, col)` of the assignment.
    pub fn press_key<const R: usize, const C: usize>(&self, pins: &PinAssignment<R, C>, row: usize, col: usize) {
        self.press(pins.rows()[row], pins.cols()[col]);
    }

    pub fn release_key<const R: usize, const C: usize>(&self, pins: &PinAssignment<R, C>, row: usize, col: usize) {
        self.release(pins.rows()[row], pins.cols()[col]);
    }

    /// The level the pin drives, or `None` if it's an input or floating output.
    pub fn driven(&self, pin: usize) -> Option<bool> {
        self.lines.borrow()[pin].driven()
    }

    /// The level the pin would read.
    pub fn level(&self, pin: usize) -> bool {
        let lines = self.lines.borrow();
        if let Some(level) = lines[pin].driven() {
            return level;
        }

        let pulled = lines[pin].bias == GpioBias::PullUp;
        let contacts = self.contacts.borrow();
        let pulled_away = contacts
            .iter()
            .filter_map(|&(a, b)| if a == pin { Some(b) } else if b == pin { Some(a) } else { None })
            .any(|other| lines[other].driven() == Some(!pulled));

        pulled != pulled_away
    }

    pub fn line_bias(&self, pin: usize) -> GpioBias {
        self.lines.borrow()[pin].bias
    }

    pub fn is_output(&self, pin: usize) -> bool {
        self.lines.borrow()[pin].function == MockFunction::Output
    }

    pub fn is_claimed(&self, pin: usize) -> bool {
        self.used_pins[pin]
    }

    /// The most outputs seen driving `level` at the same time since the last [Self::reset_peaks].
    pub fn peak_driven(&self, level: bool) -> usize {
        self.peaks.get()[level as usize]
    }

    pub fn reset_peaks(&self) {
        self.peaks.set([0; 2]);
    }

    fn update_line(&self, pin: usize, update: impl FnOnce(&mut MockLine)) {
        update(&mut self.lines.borrow_mut()[pin]);

        let lines = self.lines.borrow();
        let mut peaks = self.peaks.get();
        for level in [false, true] {
            let driving = lines.iter().filter(|line| line.driven() == Some(level)).count();
            peaks[level as usize] = peaks[level as usize].max(driving);
        }
        self.peaks.set(peaks);
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.lines.borrow().len())
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.lines.borrow().len())
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        self.update_line(index, |line| *line = MockLine::default());

        Ok(Box::new(MockPin { driver: self, pin_index: index }))
    }
}

struct MockPin<'a> {
    driver: &'a MockGpioDriver,
    pin_index: usize,
}

impl Debug for MockPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for MockPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.update_line(self.pin_index, |line| line.function = MockFunction::Input);
        Ok(Box::new(MockInput { pin: self }))
    }

    fn as_output(&mut self, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.update_line(self.pin_index, |line| {
            line.value = initial;
            line.function = MockFunction::Output;
        });
        Ok(Box::new(MockOutput { pin: self }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.driver.line_bias(self.pin_index)
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.update_line(self.pin_index, |line| line.bias = bias);
        Ok(())
    }

    fn supports_drive_mode(&self) -> bool {
        true
    }

    fn drive_mode(&self) -> GpioDriveMode {
        self.driver.lines.borrow()[self.pin_index].drive_mode
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.driver.update_line(self.pin_index, |line| line.drive_mode = mode);
        Ok(())
    }
}

impl Drop for MockPin<'_> {
    fn drop(&mut self) {
        self.driver.update_line(self.pin_index, |line| *line = MockLine::default());
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct MockInput<'a> {
    pin: &'a MockPin<'a>,
}

impl Debug for MockInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for MockInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.pin.driver.level(self.pin.pin_index))
    }
}

struct MockOutput<'a> {
    pin: &'a MockPin<'a>,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.update_line(self.pin.pin_index, |line| line.value = value);
        Ok(())
    }
}

/// A [Delay] that doesn't sleep, but adds the requested time to its own clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time passed since the clock was created.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Delay for ManualClock {
    fn delay(&self, duration: Duration) {
        self.advance(duration);
    }
}
