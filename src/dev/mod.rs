//! Device allocation: exclusive ownership with FIFO wait queues.

mod device;

pub use device::{DeviceAllocator, DeviceSnapshot, Pid, ReleaseOutcome, RequestOutcome, DISK_DEVICE_ID};
