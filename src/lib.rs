//! Bridge between a USB CDC-ACM virtual serial port and a physical UART.
//!
//! Bytes sent by the host are buffered in one bounded queue and fed to the UART one at a time;
//! bytes received by the UART interrupt are buffered in another and packetised back to the host.
//! DTR/DSR-style flow control and in-flight line-coding changes requested by the host are handled
//! by the [`Bridge`] pump loop. Nothing here allocates or blocks.
//!
//! The host side is anything implementing [`HostPort`]; [`UsbHost`] provides one on top of
//! [usb-device](https://crates.io/crates/usb-device). The UART side is anything implementing
//! [`SerialDevice`].
//!
//! Example
//! =======
//!
//! The hardware-independent part of a firmware looks like this:
//!
//! ```no_run
//! # use usb_device::class_prelude::*;
//! # use cdc_uart_bridge::*;
//! # fn dummy<U: SerialDevice>(usb_bus: &UsbBusAllocator<impl UsbBus>, uart: U) {
//! use usb_device::prelude::*;
//!
//! static SHARED: BridgeShared<128> = BridgeShared::new();
//!
//! let port = CdcPort::new(usb_bus);
//! let device = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
//!     .strings(&[StringDescriptors::new(LangID::EN).product("USB to serial")])
//!     .expect("Failed to set strings")
//!     .device_class(USB_CLASS_CDC)
//!     .build();
//!
//! let mut bridge = Bridge::new(
//!     UsbHost::new(device, port),
//!     uart,
//!     NoIndicators,
//!     &SHARED,
//!     BridgeConfig::default(),
//! );
//!
//! // The UART receive interrupt calls `SHARED.on_uart_byte(byte)` and the DSR edge interrupt
//! // calls `SHARED.on_peer_line(level)`.
//! loop {
//!     bridge.pump();
//! }
//! # }
//! ```

#![no_std]

mod bridge;
mod buffer;
mod cdc_acm;
mod config;
mod flow;
mod host;
mod line_coding;
mod queue;
mod serial;
mod shared;
mod status;
mod usb;

#[cfg(test)]
mod mock;

pub use crate::bridge::Bridge;
pub use crate::cdc_acm::*;
pub use crate::config::*;
pub use crate::flow::FlowControl;
pub use crate::host::*;
pub use crate::line_coding::*;
pub use crate::queue::{ByteQueue, SharedQueue};
pub use crate::serial::SerialDevice;
pub use crate::shared::BridgeShared;
pub use crate::status::*;
pub use crate::usb::*;
pub use usb_device::UsbError;
