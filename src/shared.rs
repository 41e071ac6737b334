use crate::queue::SharedQueue;
use core::sync::atomic::{AtomicBool, Ordering};

/// State shared between the interrupt handlers and the pump loop.
///
/// Meant to live in a `static`. The UART receive interrupt is the only producer of
/// `serial_to_host` and the pump its only consumer; `host_to_serial` is produced and consumed by
/// the pump.
pub struct BridgeShared<const N: usize> {
    pub(crate) host_to_serial: SharedQueue<N>,
    pub(crate) serial_to_host: SharedQueue<N>,
    configured: AtomicBool,
    peer_ready: AtomicBool,
}

impl<const N: usize> BridgeShared<N> {
    pub const fn new() -> Self {
        BridgeShared {
            host_to_serial: SharedQueue::new(),
            serial_to_host: SharedQueue::new(),
            configured: AtomicBool::new(false),
            peer_ready: AtomicBool::new(false),
        }
    }

    /// Queue of bytes from the host waiting for the UART.
    pub fn host_to_serial(&self) -> &SharedQueue<N> {
        &self.host_to_serial
    }

    /// Queue of bytes from the UART waiting for the host.
    pub fn serial_to_host(&self) -> &SharedQueue<N> {
        &self.serial_to_host
    }

    /// UART receive interrupt entry point.
    ///
    /// Returns false if the byte was dropped, either because the host link is not configured or
    /// because the queue is full.
    pub fn on_uart_byte(&self, byte: u8) -> bool {
        self.is_configured() && self.serial_to_host.insert(byte)
    }

    /// Peer ready line change interrupt entry point. `ready` is the sampled logical level.
    pub fn on_peer_line(&self, ready: bool) {
        self.peer_ready.store(ready, Ordering::Release);
    }

    pub fn peer_ready(&self) -> bool {
        self.peer_ready.load(Ordering::Acquire)
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    pub(crate) fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Release);
    }
}

impl<const N: usize> Default for BridgeShared<N> {
    fn default() -> Self {
        Self::new()
    }
}
