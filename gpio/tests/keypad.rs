//! Scanning a simulated 4x4 keypad through the mock driver.

use std::time::Duration;
use keyscan_gpio::debounce::{PressDebouncer, PressState};
use keyscan_gpio::delay::Delay;
use keyscan_gpio::keypad::{GpioKeypad, Keymap, Keypad, KeypadPins, PinAssignment};
use keyscan_gpio::mock::{ManualClock, MockGpioDriver};
use keyscan_gpio::{GpioActiveLevel, GpioBias, GpioDriveMode, GpioDriver, GpioError};

const ROWS: [usize; 4] = [9, 8, 18, 17];
const COLS: [usize; 4] = [16, 15, 7, 6];

fn pins() -> PinAssignment<4, 4> {
    PinAssignment::new(ROWS, COLS).unwrap()
}

/// Builds a keypad on a fresh mock chip and hands everything to `test`.
fn with_keypad(
    active: GpioActiveLevel,
    row_drive: GpioDriveMode,
    test: impl FnOnce(&MockGpioDriver, &PinAssignment<4, 4>, &ManualClock, &mut GpioKeypad<'_, 4, 4>),
) {
    let gpio = MockGpioDriver::new(20);
    let pins = pins();
    let clock = ManualClock::new();

    let mut claimed = KeypadPins::request(&gpio, &pins).unwrap();
    claimed.configure(active, row_drive).unwrap();
    let mut keypad = claimed.keypad(Keymap::<4, 4>::STANDARD, active, &clock).unwrap();

    gpio.reset_peaks();
    test(&gpio, &pins, &clock, &mut keypad);
}

#[test]
fn setup_claims_and_configures_pins() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, _, _, _| {
        for pin in ROWS {
            assert!(gpio.is_claimed(pin));
            assert!(gpio.is_output(pin));
            assert_eq!(gpio.driven(pin), Some(true), "row {pin} should start released");
        }
        for pin in COLS {
            assert!(gpio.is_claimed(pin));
            assert!(!gpio.is_output(pin));
            assert_eq!(gpio.line_bias(pin), GpioBias::PullUp);
        }
        assert!(!gpio.is_claimed(0));
    });
}

#[test]
fn pins_in_use_cannot_be_requested_again() {
    let gpio = MockGpioDriver::new(20);
    let pins = pins();
    let _claimed = KeypadPins::request(&gpio, &pins).unwrap();
    assert_eq!(KeypadPins::request(&gpio, &pins).unwrap_err(), GpioError::AlreadyInUse);
}

#[test]
fn pins_outside_the_chip_are_rejected() {
    let gpio = MockGpioDriver::new(10);
    assert_eq!(KeypadPins::request(&gpio, &pins()).unwrap_err(), GpioError::InvalidArgument);
    assert_eq!(gpio.count(), Ok(10));
}

#[test]
fn idle_scan_finds_nothing() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, _, clock, keypad| {
        for _ in 0..10 {
            assert_eq!(keypad.scan(), Ok(None));
        }
        assert_eq!(gpio.peak_driven(false), 1, "more than one row was selected at once");
        for pin in ROWS {
            assert_eq!(gpio.driven(pin), Some(true));
        }
        // Every row waits out the settle time.
        assert_eq!(clock.now(), Duration::from_millis(10 * 4 * 10));
    });
}

#[test]
fn every_key_is_found_at_its_position() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, pins, _, keypad| {
        let keymap = *keypad.keymap();
        for row in 0..4 {
            for col in 0..4 {
                gpio.press_key(pins, row, col);
                assert_eq!(keypad.scan(), Ok(Some(keymap.key(row, col))));
                gpio.release_key(pins, row, col);

                for pin in ROWS {
                    assert_eq!(gpio.driven(pin), Some(true), "row {pin} left selected after a hit");
                }
            }
        }
        assert_eq!(gpio.peak_driven(false), 1);
    });
}

#[test]
fn scan_stops_at_the_pressed_row() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, pins, clock, keypad| {
        gpio.press_key(pins, 2, 1);
        assert_eq!(keypad.scan(), Ok(Some('8')));
        // Rows 0 and 1 came up empty, row 2 returned straight away.
        assert_eq!(clock.now(), Duration::from_millis(20));
    });
}

#[test]
fn first_key_in_scan_order_wins() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, pins, _, keypad| {
        gpio.press_key(pins, 2, 3);
        gpio.press_key(pins, 1, 2);
        assert_eq!(keypad.scan(), Ok(Some('6')));

        gpio.press_key(pins, 1, 0);
        assert_eq!(keypad.scan(), Ok(Some('4')));

        gpio.release_all();
        gpio.press_key(pins, 3, 3);
        gpio.press_key(pins, 3, 0);
        assert_eq!(keypad.scan(), Ok(Some('*')));
    });
}

#[test]
fn same_column_resolves_by_row_whatever_the_press_order() {
    for active in [GpioActiveLevel::Low, GpioActiveLevel::High] {
        with_keypad(active, GpioDriveMode::PushPull, |gpio, pins, _, keypad| {
            gpio.press_key(pins, 1, 0);
            gpio.press_key(pins, 0, 0);
            assert_eq!(keypad.scan(), Ok(Some('1')));

            gpio.release_all();
            gpio.press_key(pins, 0, 0);
            gpio.press_key(pins, 1, 0);
            assert_eq!(keypad.scan(), Ok(Some('1')));

            gpio.release_all();
            gpio.press_key(pins, 3, 2);
            gpio.press_key(pins, 2, 2);
            assert_eq!(keypad.scan(), Ok(Some('9')));
        });
    }
}

#[test]
fn setup_never_selects_a_row() {
    for active in [GpioActiveLevel::Low, GpioActiveLevel::High] {
        let gpio = MockGpioDriver::new(20);
        let pins = pins();
        let clock = ManualClock::new();

        let mut claimed = KeypadPins::request(&gpio, &pins).unwrap();
        claimed.configure(active, GpioDriveMode::PushPull).unwrap();
        let _keypad = claimed.keypad(Keymap::<4, 4>::STANDARD, active, &clock).unwrap();

        assert_eq!(gpio.peak_driven(active.asserted()), 0, "a row was selected during setup ({active:?})");
        for pin in ROWS {
            assert_eq!(gpio.driven(pin), Some(active.released()));
        }
    }
}

#[test]
fn active_high_wiring() {
    with_keypad(GpioActiveLevel::High, GpioDriveMode::PushPull, |gpio, pins, _, keypad| {
        for pin in COLS {
            assert_eq!(gpio.line_bias(pin), GpioBias::PullDown);
        }
        for pin in ROWS {
            assert_eq!(gpio.driven(pin), Some(false));
        }

        assert_eq!(keypad.scan(), Ok(None));
        gpio.press_key(pins, 3, 1);
        assert_eq!(keypad.scan(), Ok(Some('0')));
        assert_eq!(gpio.peak_driven(true), 1);
    });
}

#[test]
fn open_drain_rows_float_when_released() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::OpenDrain, |gpio, pins, _, keypad| {
        for pin in ROWS {
            assert_eq!(gpio.driven(pin), None);
        }

        gpio.press_key(pins, 0, 3);
        gpio.press_key(pins, 1, 3);
        assert_eq!(keypad.scan(), Ok(Some('A')));
        assert_eq!(gpio.peak_driven(false), 1);
    });
}

#[test]
fn settle_time_is_configurable() {
    let gpio = MockGpioDriver::new(20);
    let pins = pins();
    let clock = ManualClock::new();
    let mut claimed = KeypadPins::request(&gpio, &pins).unwrap();
    claimed.configure(GpioActiveLevel::Low, GpioDriveMode::PushPull).unwrap();
    let mut keypad = claimed
        .keypad(Keymap::<4, 4>::STANDARD, GpioActiveLevel::Low, &clock)
        .unwrap()
        .with_settle_time(Duration::from_millis(2));

    assert_eq!(keypad.scan(), Ok(None));
    assert_eq!(clock.now(), Duration::from_millis(8));
}

#[test]
fn custom_keymap_and_size() {
    let gpio = MockGpioDriver::new(8);
    let pins = PinAssignment::new([0, 1, 2], [5, 6]).unwrap();
    let clock = ManualClock::new();
    let keymap = Keymap::new([['a', 'b'], ['c', 'd'], ['e', 'f']]);

    let mut claimed = KeypadPins::request(&gpio, &pins).unwrap();
    claimed.configure(GpioActiveLevel::Low, GpioDriveMode::PushPull).unwrap();
    let mut keypad = claimed.keypad(keymap, GpioActiveLevel::Low, &clock).unwrap();

    gpio.press_key(&pins, 2, 1);
    assert_eq!(keypad.scan(), Ok(Some('f')));
}

#[test]
fn debounced_press_through_the_scanner() {
    with_keypad(GpioActiveLevel::Low, GpioDriveMode::PushPull, |gpio, pins, clock, keypad| {
        let period = Duration::from_millis(10);
        let mut debouncer = PressDebouncer::new(period);
        let mut reported = Vec::new();

        for cycle in 0..20 {
            // Key '8' held for the first 50 ms.
            if cycle < 5 {
                gpio.press_key(pins, 2, 1);
            } else {
                gpio.release_key(pins, 2, 1);
            }

            if let Some(key) = debouncer.update(keypad.scan().unwrap()) {
                reported.push((cycle, key));
            }
            clock.delay(period);
        }

        assert_eq!(reported, vec![(5, '8')]);
        assert_eq!(debouncer.state(), PressState::WaitForPress);
        assert_eq!(gpio.peak_driven(false), 1);
    });
}
