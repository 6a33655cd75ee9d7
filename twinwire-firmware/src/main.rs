//! Twinwire - I2C node firmware
//!
//! One RP2040 acting in both roles: I2C0 polls a peer node's register
//! table as controller, I2C1 exposes this node's own register table to a
//! foreign controller.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{I2C0, I2C1, PIN_6, PIN_7};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use {defmt_rtt as _, panic_probe as _};

use twinwire_core::config::MAX_PORTS;
use twinwire_core::{I2cBus, PortPool, SlaveEngine};
use twinwire_drivers::service::ToggleSwitch;
use twinwire_hal_rp2040::{Rp2040Link, Rp2040Setup, Rp2040Target, Rp2040Watchdog};

mod board;
mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => embassy_rp::i2c::InterruptHandler<I2C0>;
    I2C1_IRQ => embassy_rp::i2c::InterruptHandler<I2C1>;
});

/// Controller link on I2C0
pub type BusLink = Rp2040Link<'static, I2C0>;

/// Peripheral endpoint on I2C1
pub type TargetPort = Rp2040Target<'static, I2C1, PIN_7, PIN_6, Irqs>;

/// Shared controller bus
pub static BUS: I2cBus<ThreadModeRawMutex, BusLink> = I2cBus::new(board::BUS);

/// This node's register table
pub static ENGINE: SlaveEngine<ThreadModeRawMutex> = SlaveEngine::new();

/// Switch exposed to the foreign controller
pub static SWITCH: ToggleSwitch =
    ToggleSwitch::new(board::SWITCH_STATE_KEY, board::SWITCH_TOGGLE_KEY);

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Twinwire node starting...");

    let p = embassy_rp::init(Default::default());
    let mut watchdog = Rp2040Watchdog::new(p.WATCHDOG);

    // Controller role
    let mut pool = PortPool::<MAX_PORTS>::new();
    let setup = Rp2040Setup::new(p.I2C0, p.PIN_5, p.PIN_4, Irqs, &mut watchdog);
    if let Err(e) = BUS.initialize(&mut pool, setup) {
        error!("Controller bus setup failed: {}", e);
    }
    BUS.dump_config();

    // Peripheral role
    if let Err(e) = board::TARGET.validate() {
        error!("Invalid target config: {}", e);
    }
    let mut target = Rp2040Target::new(p.I2C1, p.PIN_7, p.PIN_6, Irqs, board::TARGET.sda.pull_up);
    if let Err(e) = ENGINE.setup(&mut target, board::TARGET.address) {
        error!("Peripheral setup failed: {}", e);
    }
    if let Err(e) = SWITCH.setup(&ENGINE) {
        error!("Switch setup failed: {}", e);
    }
    SWITCH.dump_config();

    let led = Output::new(p.PIN_25, Level::Low);

    // The engine is useless without its listener and service tasks
    if spawner.spawn(tasks::target_task(target)).is_err() {
        error!("Failed to spawn target task");
        ENGINE.mark_failed();
    }
    if spawner.spawn(tasks::service_task()).is_err() {
        error!("Failed to spawn service task");
        ENGINE.mark_failed();
    }
    if spawner.spawn(tasks::dispatch_task()).is_err() {
        error!("Failed to spawn dispatch task");
        ENGINE.mark_failed();
    }
    spawner.spawn(tasks::remote_sensor_task()).unwrap();
    spawner.spawn(tasks::mirror_task(led)).unwrap();
    spawner.spawn(tasks::watchdog_task(watchdog)).unwrap();

    ENGINE.dump_config();
    info!("All tasks spawned, node running");
}
