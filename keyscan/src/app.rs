//! The main loop: scan the keypad, debounce, report.

use log::{debug, info};
use thiserror::Error;
use keyscan_gpio::GpioError;
use keyscan_gpio::debounce::{PressDebouncer, PressState};
use keyscan_gpio::delay::Delay;
use keyscan_gpio::keypad::Keypad;
use crate::output::KeySink;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("keypad error: {0}")]
    Gpio(#[from] GpioError),
    #[error("cannot report key: {0}")]
    Output(#[from] std::io::Error),
}

/// The main app state struct.
///
/// Holds the debouncer between updates, so a press can span as many polling periods as it needs.
pub struct App<'a> {
    keypad: &'a mut dyn Keypad<Key = char>,
    debouncer: PressDebouncer<char>,
    sink: &'a mut dyn KeySink,
    delay: &'a dyn Delay,
}

impl<'a> App<'a> {
    pub fn new(
        keypad: &'a mut dyn Keypad<Key = char>,
        debouncer: PressDebouncer<char>,
        sink: &'a mut dyn KeySink,
        delay: &'a dyn Delay,
    ) -> App<'a> {
        App {
            keypad,
            debouncer,
            sink,
            delay,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PressState<char> {
        self.debouncer.state()
    }

    /// Scans once and feeds the result to the debouncer, reporting the key if a press just completed.
    pub fn update(&mut self) -> Result<Option<char>, AppError> {
        let scanned = self.keypad.scan()?;
        let Some(key) = self.debouncer.update(scanned) else {
            return Ok(None);
        };

        info!("Key {:?} pressed.", key);
        self.sink.emit(key)?;
        Ok(Some(key))
    }

    /// Updates, then waits out the polling period.
    pub fn step(&mut self) -> Result<Option<char>, AppError> {
        let key = self.update()?;
        self.delay.delay(self.debouncer.period());
        Ok(key)
    }

    /// Runs until the keypad or the output fails.
    pub fn run(&mut self) -> Result<(), AppError> {
        debug!(
            "Polling {:?} every {:?}, debounce {:?}",
            self.keypad,
            self.debouncer.period(),
            self.debouncer.debounce_time,
        );
        loop {
            self.step()?;
        }
    }
}
