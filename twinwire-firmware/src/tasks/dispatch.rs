//! Register callback dispatch
//!
//! Runs callbacks for keys the foreign controller selected, outside the
//! peripheral service loop.

use defmt::*;

use crate::ENGINE;

#[embassy_executor::task]
pub async fn dispatch_task() {
    info!("Dispatch task started");

    loop {
        let key = ENGINE.next_write().await;
        if !ENGINE.dispatch(key) {
            debug!("Key 0x{:02x} lost its callback", key);
        }
    }
}
