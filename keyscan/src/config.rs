use std::env::var_os;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use eyre::{ensure, WrapErr};
use serde::{Serialize, Deserialize};
use keyscan_gpio::{GpioActiveLevel, GpioDriveMode};
use keyscan_gpio::keypad::Keymap;

/// Timing, wiring and layout of the keypad.
///
/// Pins are not part of it; they come from the environment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Time between two scans, in milliseconds.
    pub poll_period_ms: u64,
    /// How long a key has to stay down to count, in milliseconds.
    pub debounce_ms: u64,
    /// Pause after each empty row, in milliseconds.
    pub settle_ms: u64,
    pub active_level: GpioActiveLevel,
    pub row_drive: GpioDriveMode,
    pub keymap: [[char; 4]; 4],
}

impl Config {
    pub fn path() -> PathBuf {
        let config_str = var_os("CONFIG_FILE");
        PathBuf::from(config_str.as_deref().unwrap_or(OsStr::new("keyscan.json")))
    }

    /// Loads the config from `CONFIG_FILE`, or `None` if there is no such file.
    pub fn try_load() -> eyre::Result<Option<Self>> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> eyre::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)
            .wrap_err_with(|| format!("Cannot open {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Invalid config in {}", path.display()))?;
        config.validate()?;

        Ok(Some(config))
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(self.poll_period_ms > 0, "poll_period_ms must be at least 1");
        Ok(())
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    pub fn debounce_time(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn keymap(&self) -> Keymap<4, 4> {
        Keymap::new(self.keymap)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_period_ms: 10,
            debounce_ms: 40,
            settle_ms: 10,
            active_level: GpioActiveLevel::Low,
            row_drive: GpioDriveMode::PushPull,
            keymap: *Keymap::<4, 4>::STANDARD.rows(),
        }
    }
}
