//! Local register publishing
//!
//! Republishes the peer's reading in this node's register table and keeps
//! the switch keys and status LED in step with the switch.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{with_timeout, Duration};
use twinwire_drivers::service::SensorMirror;

use crate::board::{MIRROR_KEY, POLL_INTERVAL_MS};
use crate::channels::REMOTE_READING;
use crate::{ENGINE, SWITCH};

#[embassy_executor::task]
pub async fn mirror_task(mut led: Output<'static>) {
    info!("Mirror task started");

    let mirror = SensorMirror::new(MIRROR_KEY);
    if let Err(e) = mirror.setup(&ENGINE) {
        error!("Mirror setup failed: {}", e);
    }
    mirror.dump_config(&ENGINE);

    loop {
        let timeout = Duration::from_millis(POLL_INTERVAL_MS);
        if let Ok(value) = with_timeout(timeout, REMOTE_READING.wait()).await {
            if let Err(e) = mirror.update(&ENGINE, value) {
                warn!("Publishing reading failed: {}", e);
            }
        }

        match SWITCH.update(&ENGINE) {
            Ok(true) => debug!("Switch keys resynced"),
            Ok(false) => {}
            Err(e) => warn!("Publishing switch failed: {}", e),
        }
        led.set_level(SWITCH.is_on().into());
    }
}
