//! # Motor Controller Bus Command Line Utility
//!
//! One-shot tool for working with devices on the motor controller bus
//! during integration: move a servo, spin a motor, read the input voltage
//! or check a device's identity. Implements the subset of bus operations
//! the hardware team needs at the bench.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use std::convert::TryFrom;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use mctrl_if::device::AddressConfig;
use mctrl_if::{BusParams, DeviceAddress, DeviceClass, DmfeController, MotorController};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Motor controller bus command line utility.
#[derive(Debug, StructOpt)]
#[structopt(name = "mctrl_cli")]
struct Opt {
    /// Device identifier, 2-253.
    #[structopt(short, long, default_value = "2")]
    id: u8,

    /// Serial port of the bus, overriding the parameter file.
    #[structopt(short, long)]
    port: Option<String>,

    /// Baud rate of the bus, overriding the parameter file.
    #[structopt(short, long)]
    baud: Option<u32>,

    #[structopt(subcommand)]
    command: Command,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Operations which can be performed against a single bus device.
#[derive(Debug, StructOpt)]
enum Command {
    /// Move a servo to the given raw position, 0-4096 with 2048 at centre.
    ///
    /// The device is checked to be a serial servo before it is commanded.
    Move {
        /// Target position in native counts.
        position: u16,
    },

    /// Spin a brushed motor at the given percentage of full power.
    ///
    /// The device is checked to be a serial brushed controller before it is
    /// commanded.
    Spin {
        /// Power percentage, -100 to 100, negative reversed.
        #[structopt(allow_hyphen_values = true)]
        power: f64,
    },

    /// Read the device's input voltage.
    Voltage,

    /// Check that the device reports the given identity ("servo" or
    /// "brushed").
    Identify {
        /// The expected device class.
        class: DeviceClass,
    },
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- LOAD PARAMETERS ----

    let params: BusParams =
        util::params::load("mctrl.toml").wrap_err("Could not load bus params")?;

    let port = opt.port.unwrap_or(params.connect.port);
    let baud = opt.baud.unwrap_or(params.connect.baud);

    // ---- OPEN THE BUS ----

    let channel = serialport::new(&port, baud)
        .timeout(Duration::from_secs_f64(params.connect.timeout_s))
        .open()
        .wrap_err_with(|| format!("Failed to open the bus port {:?}", port))?;

    let mut controller = DmfeController::new(channel, params.controller);

    let addr = DeviceAddress::try_from(AddressConfig {
        addr: opt.id,
        centre_offset: 0,
        inverted: false,
    })?;

    // ---- EXECUTE ----

    match opt.command {
        Command::Move { position } => {
            controller
                .identify(&addr, DeviceClass::Servo)
                .wrap_err("Device identity check failed")?;

            controller.set_position(&addr, position)?;

            println!("Moved device {} to position {}", opt.id, position);
        }

        Command::Spin { power } => {
            controller
                .identify(&addr, DeviceClass::Brushed)
                .wrap_err("Device identity check failed")?;

            controller.set_power(&addr, power)?;

            println!("Spinning motor {} at {} %", opt.id, power);
        }

        Command::Voltage => {
            let volts = controller.read_voltage(&addr)?;

            println!("Device {} reports {:.2} V", opt.id, volts);
        }

        Command::Identify { class } => {
            controller.identify(&addr, class)?;

            println!("Device {} is a {}", opt.id, class);
        }
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_argument_shapes() {
        let opt = Opt::from_iter(&["mctrl_cli", "--id", "7", "move", "2048"]);
        assert_eq!(opt.id, 7);
        match opt.command {
            Command::Move { position: 2048 } => (),
            other => panic!("unexpected command {:?}", other),
        }

        let opt = Opt::from_iter(&["mctrl_cli", "spin", "-25"]);
        assert_eq!(opt.id, 2);
        match opt.command {
            Command::Spin { power } => assert_eq!(power, -25.0),
            other => panic!("unexpected command {:?}", other),
        }

        let opt = Opt::from_iter(&["mctrl_cli", "voltage"]);
        match opt.command {
            Command::Voltage => (),
            other => panic!("unexpected command {:?}", other),
        }

        let opt = Opt::from_iter(&["mctrl_cli", "identify", "servo"]);
        match opt.command {
            Command::Identify {
                class: DeviceClass::Servo,
            } => (),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
