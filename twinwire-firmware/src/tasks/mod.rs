//! Embassy async tasks
//!
//! Each task runs independently and communicates via the shared engines
//! and the signals in [`crate::channels`].

pub mod dispatch;
pub mod mirror;
pub mod remote;
pub mod service;
pub mod target;
pub mod watchdog;

pub use dispatch::dispatch_task;
pub use mirror::mirror_task;
pub use remote::remote_sensor_task;
pub use service::service_task;
pub use target::target_task;
pub use watchdog::watchdog_task;
