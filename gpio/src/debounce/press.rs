use std::fmt::Debug;
use std::time::Duration;
use log::debug;

/// The state of a [PressDebouncer].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PressState<K> {
    /// Nothing is being tracked.
    WaitForPress,
    /// A key showed up and is waiting out the debounce time.
    ///
    /// The input is not looked at again until `elapsed` reaches the threshold.
    Debouncing {
        candidate: K,
        elapsed: Duration,
    },
    /// The key was confirmed and will be reported once everything is released.
    WaitForRelease {
        candidate: K,
    },
}

impl<K> Default for PressState<K> {
    fn default() -> Self {
        PressState::WaitForPress
    }
}

/// Turns a stream of raw scan results into one event per press-release cycle.
///
/// Meant to be fed exactly once per polling period. A key has to be read again, unchanged,
/// once the debounce time has passed, otherwise it is dropped as bounce. Confirmed keys are
/// reported when the keypad goes idle, not when the key goes down, so holding a key never
/// repeats it.
#[derive(Clone, Debug)]
pub struct PressDebouncer<K> {
    state: PressState<K>,
    period: Duration,
    pub debounce_time: Duration,
}

impl<K: Copy + PartialEq + Debug> PressDebouncer<K> {
    /// Creates a debouncer that is updated every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            state: PressState::WaitForPress,
            period,
            debounce_time: Duration::from_millis(40),
        }
    }

    pub fn with_debounce_time(mut self, debounce_time: Duration) -> Self {
        self.debounce_time = debounce_time;
        self
    }

    /// The polling period this debouncer counts in.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> PressState<K> {
        self.state
    }

    /// Advances the state machine by one polling period.
    ///
    /// `input` is the key currently read from the keypad, if any.
    /// Returns the key to report, if a press-release cycle just completed.
    pub fn update(&mut self, input: Option<K>) -> Option<K> {
        let (next, released) = match self.state {
            PressState::WaitForPress => match input {
                Some(candidate) => (PressState::Debouncing { candidate, elapsed: Duration::ZERO }, None),
                None => (PressState::WaitForPress, None),
            },
            PressState::Debouncing { candidate, elapsed } => {
                let elapsed = elapsed.saturating_add(self.period);
                if elapsed < self.debounce_time {
                    (PressState::Debouncing { candidate, elapsed }, None)
                } else if input == Some(candidate) {
                    (PressState::WaitForRelease { candidate }, None)
                } else {
                    debug!("Dropping {:?} as bounce, read {:?} after {:?}", candidate, input, elapsed);
                    (PressState::WaitForPress, None)
                }
            }
            PressState::WaitForRelease { candidate } => match input {
                Some(_) => (PressState::WaitForRelease { candidate }, None),
                None => (PressState::WaitForPress, Some(candidate)),
            },
        };

        if std::mem::discriminant(&next) != std::mem::discriminant(&self.state) {
            debug!("{:?} -> {:?}", self.state, next);
        }
        self.state = next;

        released
    }
}
