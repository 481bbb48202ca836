mod gpio;
mod keymap;

use std::fmt::Debug;
use crate::GpioResult;
pub use gpio::*;
pub use keymap::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Finds the key currently held down, if any.
    ///
    /// Only one key is reported. When several are held, the implementation decides which one wins.
    fn scan(&mut self) -> GpioResult<Option<Self::Key>>;
}
