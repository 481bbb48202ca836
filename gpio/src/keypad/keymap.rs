use crate::{GpioError, GpioResult};

/// The characters printed on a keypad, indexed by `(row, column)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Keymap<const R: usize, const C: usize> {
    keys: [[char; C]; R],
}

impl<const R: usize, const C: usize> Keymap<R, C> {
    pub const fn new(keys: [[char; C]; R]) -> Self {
        Self { keys }
    }

    /// Gets the key at the given position.
    ///
    /// # Panics
    /// If the position is outside the keymap.
    pub fn key(&self, row: usize, col: usize) -> char {
        self.keys[row][col]
    }

    pub fn rows(&self) -> &[[char; C]; R] {
        &self.keys
    }
}

impl Keymap<4, 4> {
    /// The usual 4x4 membrane keypad layout.
    pub const STANDARD: Self = Self::new([
        ['1', '2', '3', 'A'],
        ['4', '5', '6', 'B'],
        ['7', '8', '9', 'C'],
        ['*', '0', '#', 'D'],
    ]);
}

impl Default for Keymap<4, 4> {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Which GPIO pins the keypad rows and columns are wired to, in order.
///
/// Every pin appears once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinAssignment<const R: usize, const C: usize> {
    rows: [usize; R],
    cols: [usize; C],
}

impl<const R: usize, const C: usize> PinAssignment<R, C> {
    /// # Errors
    /// - `GpioError::DuplicatePin` if a pin appears more than once.
    pub fn new(rows: [usize; R], cols: [usize; C]) -> GpioResult<Self> {
        let mut seen = Vec::with_capacity(R + C);
        for pin in rows.into_iter().chain(cols) {
            if seen.contains(&pin) {
                return Err(GpioError::DuplicatePin(pin));
            }
            seen.push(pin);
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> &[usize; R] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize; C] {
        &self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_lookup() {
        let keymap = Keymap::<4, 4>::STANDARD;
        assert_eq!(keymap.key(0, 0), '1');
        assert_eq!(keymap.key(2, 1), '8');
        assert_eq!(keymap.key(3, 3), 'D');
        assert_eq!(Keymap::default(), keymap);
    }

    #[test]
    fn pin_assignment_keeps_order() {
        let pins = PinAssignment::new([9, 8, 18, 17], [16, 15, 7, 6]).unwrap();
        assert_eq!(pins.rows(), &[9, 8, 18, 17]);
        assert_eq!(pins.cols(), &[16, 15, 7, 6]);
    }

    #[test]
    fn pin_assignment_rejects_duplicates() {
        assert_eq!(
            PinAssignment::new([1, 2], [3, 2]),
            Err(GpioError::DuplicatePin(2)),
        );
        assert_eq!(
            PinAssignment::new([4, 4], [5]),
            Err(GpioError::DuplicatePin(4)),
        );
    }
}
