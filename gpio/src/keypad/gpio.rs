use std::fmt::{Debug, Formatter};
use std::time::Duration;
use log::{debug, trace};
use crate::delay::Delay;
use crate::keypad::{Keymap, Keypad, PinAssignment};
use crate::{GpioActiveLevel, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};

/// The claimed pins of a matrix keypad, before they are turned into inputs and outputs.
pub struct KeypadPins<'d, const R: usize, const C: usize> {
    rows: [Box<dyn GpioPin + 'd>; R],
    cols: [Box<dyn GpioPin + 'd>; C],
}

impl<const R: usize, const C: usize> Debug for KeypadPins<'_, R, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeypadPins(rows: {:?}, cols: {:?})", self.rows, self.cols)
    }
}

fn into_array<T, const N: usize>(items: Vec<T>) -> GpioResult<[T; N]> {
    items.try_into().map_err(|_| GpioError::InvalidArgument)
}

impl<'d, const R: usize, const C: usize> KeypadPins<'d, R, C> {
    /// Claims every pin of the assignment from the driver.
    pub fn request<D: GpioDriver + ?Sized>(driver: &'d D, pins: &PinAssignment<R, C>) -> GpioResult<Self> {
        let rows = pins.rows().iter().map(|&pin| driver.get_pin(pin)).collect::<GpioResult<Vec<_>>>()?;
        let cols = pins.cols().iter().map(|&pin| driver.get_pin(pin)).collect::<GpioResult<Vec<_>>>()?;

        Ok(KeypadPins {
            rows: into_array(rows)?,
            cols: into_array(cols)?,
        })
    }

    /// Sets the row drive mode and pulls the columns towards the released level.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if a non-default drive mode is asked for on a backend without one,
    ///   or if the columns cannot be biased.
    pub fn configure(&mut self, active: GpioActiveLevel, row_drive: GpioDriveMode) -> GpioResult<()> {
        for row in self.rows.iter_mut() {
            if row.supports_drive_mode() {
                row.set_drive_mode(row_drive)?;
            } else if row_drive != GpioDriveMode::PushPull {
                return Err(GpioError::NotSupported);
            }
        }

        let bias = active.idle_bias();
        for col in self.cols.iter_mut() {
            col.set_bias(bias)?;
        }

        debug!("Keypad pins configured: active {:?}, rows {:?}, columns {:?}", active, row_drive, bias);
        Ok(())
    }

    /// Turns the rows into outputs and the columns into inputs, and hands them to a new [GpioKeypad].
    pub fn keypad<'k>(
        &'k mut self,
        keymap: Keymap<R, C>,
        active: GpioActiveLevel,
        delay: &'k dyn Delay,
    ) -> GpioResult<GpioKeypad<'k, R, C>> {
        let rows = self.rows.iter_mut().map(|pin| pin.as_output(active.released())).collect::<GpioResult<Vec<_>>>()?;
        let cols = self.cols.iter_mut().map(|pin| pin.as_input()).collect::<GpioResult<Vec<_>>>()?;

        GpioKeypad::new(into_array(rows)?, into_array(cols)?, keymap, active, delay)
    }
}

/// A matrix keypad scanned one row at a time.
///
/// Each row is asserted on its own while the columns are sampled, so a key in another row can
/// never show up in the selected one. Every row is released again before [Keypad::scan] returns.
pub struct GpioKeypad<'a, const R: usize, const C: usize> {
    rows: [Box<dyn GpioOutput + 'a>; R],
    cols: [Box<dyn GpioInput + 'a>; C],
    keymap: Keymap<R, C>,
    active: GpioActiveLevel,
    delay: &'a dyn Delay,
    pub settle_time: Duration,
}

impl<const R: usize, const C: usize> Debug for GpioKeypad<'_, R, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({}x{}, active {:?}, rows: {:?}, cols: {:?})", R, C, self.active, self.rows, self.cols)
    }
}

impl<'a, const R: usize, const C: usize> GpioKeypad<'a, R, C> {
    /// Creates a new `GpioKeypad` and releases all of its rows.
    ///
    /// The rows are driven to select a row, and the columns are read to find the pressed key
    /// in the selected row. `active` is the level of both a selected row and a pressed column.
    pub fn new(
        rows: [Box<dyn GpioOutput + 'a>; R],
        cols: [Box<dyn GpioInput + 'a>; C],
        keymap: Keymap<R, C>,
        active: GpioActiveLevel,
        delay: &'a dyn Delay,
    ) -> GpioResult<Self> {
        let keypad = GpioKeypad {
            rows,
            cols,
            keymap,
            active,
            delay,
            settle_time: Duration::from_millis(10),
        };
        keypad.release_all()?;
        Ok(keypad)
    }

    /// Sets how long to wait after releasing a row before selecting the next one.
    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn keymap(&self) -> &Keymap<R, C> {
        &self.keymap
    }

    fn release_all(&self) -> GpioResult<()> {
        for row in &self.rows {
            row.write(self.active.released())?;
        }
        Ok(())
    }

    /// Finds the first asserted column, reading them in order.
    fn asserted_column(&self) -> GpioResult<Option<usize>> {
        for (col, line) in self.cols.iter().enumerate() {
            if self.active.is_asserted(line.read()?) {
                return Ok(Some(col));
            }
        }
        Ok(None)
    }
}

impl<const R: usize, const C: usize> Keypad for GpioKeypad<'_, R, C> {
    type Key = char;

    /// Scans rows top to bottom and columns left to right; the first pressed key wins.
    fn scan(&mut self) -> GpioResult<Option<char>> {
        for (row, line) in self.rows.iter().enumerate() {
            line.write(self.active.asserted())?;
            let col = self.asserted_column();
            // Release before looking at the result, so a failed read doesn't leave the row selected.
            line.write(self.active.released())?;

            if let Some(col) = col? {
                let key = self.keymap.key(row, col);
                trace!("Key {:?} down at ({}, {})", key, row, col);
                return Ok(Some(key));
            }

            self.delay.delay(self.settle_time);
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::mock::ManualClock;

    #[derive(Debug)]
    struct BrokenInput;

    impl GpioInput for BrokenInput {
        fn read(&self) -> GpioResult<bool> {
            Err(GpioError::NotSupported)
        }
    }

    #[derive(Debug)]
    struct LatchedOutput<'a>(&'a Cell<Option<bool>>);

    impl GpioOutput for LatchedOutput<'_> {
        fn write(&self, value: bool) -> GpioResult<()> {
            self.0.set(Some(value));
            Ok(())
        }
    }

    #[test]
    fn failed_read_releases_the_row() {
        for active in [GpioActiveLevel::Low, GpioActiveLevel::High] {
            let row = Cell::new(None);
            let clock = ManualClock::new();
            let mut keypad = GpioKeypad::new(
                [Box::new(LatchedOutput(&row))],
                [Box::new(BrokenInput)],
                Keymap::new([['x']]),
                active,
                &clock,
            )
            .unwrap();

            assert_eq!(keypad.scan(), Err(GpioError::NotSupported));
            assert_eq!(row.get(), Some(active.released()));
            assert_eq!(clock.now(), Duration::ZERO);
        }
    }
}
