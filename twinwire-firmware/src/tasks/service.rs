//! Slave service task
//!
//! Consumes the engine's event queue and hands each reply to the target
//! task, which owns the peripheral.

use defmt::*;
use embassy_time::{with_timeout, Duration};
use twinwire_core::config::MISS_RESPONSE_LEN;
use twinwire_hal::i2c::TargetEndpoint;

use crate::channels::{Reply, REPLIES};
use crate::ENGINE;

/// Transmit path that forwards replies to the target task
pub struct ReplyPort;

/// The target task stopped taking replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ReplyTimeout;

impl TargetEndpoint for ReplyPort {
    type Error = ReplyTimeout;

    /// The peripheral itself is enabled by the engine setup in `main`
    fn enable(&mut self, _address: u8) -> Result<(), ReplyTimeout> {
        Ok(())
    }

    async fn write(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, ReplyTimeout> {
        let len = data.len().min(MISS_RESPONSE_LEN);
        let mut reply = Reply::new();
        // Reply holds MISS_RESPONSE_LEN bytes
        let _ = reply.extend_from_slice(&data[..len]);

        with_timeout(Duration::from_millis(u64::from(timeout_ms)), REPLIES.send(reply))
            .await
            .map_err(|_| ReplyTimeout)?;
        Ok(len)
    }
}

#[embassy_executor::task]
pub async fn service_task() {
    info!("Service task started");
    ENGINE.run(&mut ReplyPort).await
}
