//! Peer polling
//!
//! Reads the peer's sensor key once per poll period and hands each value
//! to the mirror task. The peer's switch is driven to follow this node's
//! switch.

use defmt::*;
use embassy_time::{Delay, Duration, Ticker};
use twinwire_core::I2cDevice;
use twinwire_drivers::client::{RemoteSensor, RemoteSwitch};

use crate::board::{PEER, PEER_SENSOR_KEY, PEER_SWITCH, POLL_INTERVAL_MS};
use crate::channels::REMOTE_READING;
use crate::{BUS, SWITCH};

#[embassy_executor::task]
pub async fn remote_sensor_task() {
    info!("Remote sensor task started");

    let mut sensor = RemoteSensor::new(I2cDevice::from_config(&BUS, &PEER), PEER_SENSOR_KEY);
    sensor.dump_config();
    let mut switch = RemoteSwitch::new(I2cDevice::from_config(&BUS, &PEER), PEER_SWITCH);
    switch.dump_config();

    let mut delay = Delay;
    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    loop {
        ticker.next().await;

        // Failures are logged once by the sensor and retried next period
        if let Ok(value) = sensor.update(&mut delay).await {
            REMOTE_READING.signal(value);
        }

        let wanted = SWITCH.is_on();
        let current = match switch.update(&mut delay).await {
            Ok(on) => Some(on),
            Err(_) => switch.state(),
        };
        if current != Some(wanted) && switch.set(wanted).await.is_ok() {
            debug!("Peer switch set {}", wanted);
        }
    }
}
