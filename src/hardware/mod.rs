//! Hardware seam: the driver interface and its simulated implementation.

pub mod device;
pub mod mock;

pub use device::{AttributeValue, Command, DeviceHandle, PortDriver, PortId};
