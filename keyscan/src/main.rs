mod app;
mod config;
mod output;

use std::env::var;
use std::io;
use std::path::Path;
use dotenv::dotenv;
use eyre::{bail, WrapErr};
use log::{debug, info, warn};
use sysinfo::System;
use keyscan_gpio::GpioDriver;
use keyscan_gpio::debounce::PressDebouncer;
use keyscan_gpio::delay::ThreadDelay;
use keyscan_gpio::gpiod::GpiodDriver;
use keyscan_gpio::keypad::{KeypadPins, PinAssignment};
use keyscan_gpio::mock::MockGpioDriver;
use keyscan_gpio::raw::RawGpioDriver;
use crate::app::App;
use crate::config::Config;
use crate::output::LineSink;

fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Expected exactly 4 pins"))
}

fn pin_bus_from_env(name: &str) -> eyre::Result<[usize; 4]> {
    let pin_str = var(name).wrap_err_with(|| format!("{} is not set", name))?;
    parse_pin_bus(&pin_str).wrap_err_with(|| format!("Invalid {}: {:?}", name, pin_str))
}

/// Opens the GPIO backend named by `KEYSCAN_GPIO`.
fn open_gpio(backend: &str) -> eyre::Result<Box<dyn GpioDriver>> {
    let gpio: Box<dyn GpioDriver> = match backend {
        "gpiomem" => Box::new(RawGpioDriver::new_gpiomem()?),
        "mem" => Box::new(RawGpioDriver::new_mem()?),
        "mock" => {
            warn!("Using the mock GPIO driver, no key will ever be pressed.");
            Box::new(MockGpioDriver::new(64))
        }
        _ => match backend.strip_prefix("gpiod:") {
            Some(path) => Box::new(GpiodDriver::open(Path::new(path))?),
            None => bail!("Unknown GPIO backend {:?}", backend),
        },
    };
    Ok(gpio)
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("Keyscan v.{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Host {} running {} (kernel {})",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    let rows = pin_bus_from_env("KEYSCAN_PINS_ROWS")?;
    let cols = pin_bus_from_env("KEYSCAN_PINS_COLS")?;
    let pins = PinAssignment::new(rows, cols)?;
    info!("Keypad @ Rows: {:?}, Cols: {:?}", rows, cols);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved to {}.", Config::path().display());
        config
    };
    debug!("{:?}", config);

    let backend = var("KEYSCAN_GPIO").unwrap_or_else(|_| "gpiomem".to_string());
    debug!("Initializing GPIO driver ({})...", backend);
    let gpio = open_gpio(&backend)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing keypad driver...");
    let delay = ThreadDelay;
    let mut keypad_pins = KeypadPins::request(&*gpio, &pins)?;
    keypad_pins.configure(config.active_level, config.row_drive)?;
    let mut keypad = keypad_pins
        .keypad(config.keymap(), config.active_level, &delay)?
        .with_settle_time(config.settle_time());
    debug!("{:?} initialized.", keypad);

    let debouncer = PressDebouncer::new(config.poll_period())
        .with_debounce_time(config.debounce_time());
    let stdout = io::stdout();
    let mut sink = LineSink::new(stdout.lock());

    info!("Starting main loop...");
    let mut app = App::new(&mut keypad, debouncer, &mut sink, &delay);
    app.run()?;

    Ok(())
}
