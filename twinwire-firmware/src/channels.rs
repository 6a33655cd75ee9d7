//! Inter-task communication channels

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use twinwire_core::config::MISS_RESPONSE_LEN;

/// Reply bytes for one read by the foreign controller
pub type Reply = Vec<u8, MISS_RESPONSE_LEN>;

/// Latest value read from the peer node
pub static REMOTE_READING: Signal<CriticalSectionRawMutex, f32> = Signal::new();

/// Replies from the slave service task to the target task
pub static REPLIES: Channel<ThreadModeRawMutex, Reply, 1> = Channel::new();
