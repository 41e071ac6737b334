//! Bridge tuning parameters.

/// Capacity of each direction's queue.
pub const DEFAULT_CAPACITY: usize = 128;

/// Occupancy threshold for flow-control backpressure. Backpressure is asserted once fewer than
/// this many bytes are free in the serial-to-host queue and released once fewer than this many
/// are queued.
pub const DEFAULT_WATERMARK: usize = 16;

/// Bytes left unused at the end of each packet sent to the host, so a full packet (which
/// would need a terminating zero-length packet) is never sent.
pub const DEFAULT_PACKET_MARGIN: usize = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Gate the UART transmitter on the peer ready line and drop the local ready line under
    /// backpressure.
    pub enforce_flow_control: bool,
    pub watermark: usize,
    pub packet_margin: usize,
}

impl BridgeConfig {
    pub const fn new() -> Self {
        BridgeConfig {
            enforce_flow_control: false,
            watermark: DEFAULT_WATERMARK,
            packet_margin: DEFAULT_PACKET_MARGIN,
        }
    }

    pub const fn with_flow_control(mut self, enforce: bool) -> Self {
        self.enforce_flow_control = enforce;
        self
    }

    pub const fn with_watermark(mut self, watermark: usize) -> Self {
        self.watermark = watermark;
        self
    }

    pub const fn with_packet_margin(mut self, margin: usize) -> Self {
        self.packet_margin = margin;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
