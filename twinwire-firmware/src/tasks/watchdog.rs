//! Watchdog feed task

use defmt::*;
use embassy_time::{Duration, Ticker};
use twinwire_hal::watchdog::Watchdog;
use twinwire_hal_rp2040::Rp2040Watchdog;

use crate::board::WATCHDOG_PERIOD_MS;

#[embassy_executor::task]
pub async fn watchdog_task(mut watchdog: Rp2040Watchdog) {
    info!("Watchdog task started");

    watchdog.start(Duration::from_millis(WATCHDOG_PERIOD_MS));
    let mut ticker = Ticker::every(Duration::from_millis(WATCHDOG_PERIOD_MS / 4));
    loop {
        ticker.next().await;
        watchdog.feed();
    }
}
