//! Peripheral listener task
//!
//! Feeds every transfer from the foreign controller into the slave
//! engine. A read leaves the controller clock-stretched until the service
//! task has produced the reply, which this task then clocks out.

use defmt::*;
use embassy_time::{with_timeout, Duration};
use twinwire_core::config::SEND_TIMEOUT_MS;
use twinwire_hal::i2c::TargetEndpoint;
use twinwire_hal_rp2040::TargetRequest;

use crate::channels::REPLIES;
use crate::{TargetPort, ENGINE};

/// Largest write accepted from the controller
const RX_BUFFER_LEN: usize = 32;

#[embassy_executor::task]
pub async fn target_task(mut target: TargetPort) {
    info!("Target task started");

    let mut buf = [0u8; RX_BUFFER_LEN];
    loop {
        match target.listen(&mut buf).await {
            Ok(TargetRequest::Write(len)) => ENGINE.on_receive(&buf[..len]),
            Ok(TargetRequest::WriteRead(len)) => {
                ENGINE.on_receive(&buf[..len]);
                reply(&mut target).await;
            }
            Ok(TargetRequest::Read) => reply(&mut target).await,
            Ok(TargetRequest::GeneralCall(len)) => {
                debug!("Ignoring general call ({} bytes)", len);
            }
            Err(e) => warn!("Target listen failed: {}", e),
        }
    }
}

/// Ask the engine for a reply and send it
///
/// Without a reply in time the controller gets fill bytes, so it is never
/// left stretched.
async fn reply(target: &mut TargetPort) {
    while REPLIES.try_receive().is_ok() {
        warn!("Discarding late reply");
    }

    let timeout = Duration::from_millis(u64::from(SEND_TIMEOUT_MS));
    let bytes = if ENGINE.is_running() {
        ENGINE.on_request();
        match with_timeout(timeout, REPLIES.receive()).await {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("No reply from service task");
                Default::default()
            }
        }
    } else {
        Default::default()
    };

    if let Err(e) = target.write(&bytes, SEND_TIMEOUT_MS).await {
        warn!("Reply failed: {}", e);
    }
}
