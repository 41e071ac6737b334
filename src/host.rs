use crate::line_coding::LineCoding;
use crate::status::LinkStatus;
use thiserror::Error;
use usb_device::UsbError;

/// Failure to hand data or a notification to the host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    /// Nothing could be accepted right now. Retry on a later iteration.
    #[error("host transport busy")]
    Busy,

    #[error("usb error: {0:?}")]
    Usb(UsbError),
}

impl From<UsbError> for HostError {
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::WouldBlock => HostError::Busy,
            other => HostError::Usb(other),
        }
    }
}

/// Control line state set by the host with SET_CONTROL_LINE_STATE.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlLines {
    /// Data terminal ready
    pub dtr: bool,

    /// Request to send
    pub rts: bool,
}

impl ControlLines {
    pub fn from_value(value: u16) -> Self {
        ControlLines {
            dtr: (value & 0x0001) != 0,
            rts: (value & 0x0002) != 0,
        }
    }
}

/// Device-to-host line state, reported with a SERIAL_STATE notification.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SerialState {
    /// Data carrier detect (bRxCarrier)
    pub dcd: bool,

    /// Data set ready (bTxCarrier)
    pub dsr: bool,
}

impl SerialState {
    pub fn bits(&self) -> u16 {
        (self.dcd as u16) | ((self.dsr as u16) << 1)
    }
}

/// Requests from the host collected while servicing the transport.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HostEvents {
    pub line_coding: Option<LineCoding>,
    pub control_lines: Option<ControlLines>,
}

impl HostEvents {
    pub fn is_empty(&self) -> bool {
        self.line_coding.is_none() && self.control_lines.is_none()
    }
}

/// The host-facing side of the bridge.
///
/// Nothing here may block: operations that cannot complete immediately return `None`, `false`
/// or [`HostError::Busy`].
pub trait HostPort {
    /// Services the transport and returns the host requests received since the last call.
    fn poll(&mut self) -> HostEvents;

    /// Whether the host has configured the device. No data moves before this.
    fn is_configured(&self) -> bool;

    /// Link state for display. Ports that cannot tell enumeration apart only report whether
    /// they are configured.
    fn link_status(&self) -> LinkStatus {
        if self.is_configured() {
            LinkStatus::Ready
        } else {
            LinkStatus::NotReady
        }
    }

    fn receive_byte(&mut self) -> Option<u8>;

    /// Whether a new packet towards the host can be started.
    fn is_send_ready(&self) -> bool;

    fn send_byte(&mut self, byte: u8) -> Result<(), HostError>;

    fn max_packet_size(&self) -> usize;

    fn notify_serial_state(&mut self, state: SerialState) -> Result<(), HostError>;
}
