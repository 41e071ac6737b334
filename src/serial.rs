use crate::line_coding::Framing;

/// The physical UART side of the bridge.
///
/// Transmission goes through [`embedded_hal::serial::Write`]: `write` returning `WouldBlock`
/// means the transmitter is not ready for another byte. `flush` is never called by the bridge.
///
/// The remaining methods are the register-level operations needed to reconfigure the port. They
/// are only called from inside a critical section.
pub trait SerialDevice: embedded_hal::serial::Write<u8> {
    /// Turns the transmitter and receiver (and the receive interrupt) off.
    fn disable(&mut self);

    /// Turns the transmitter and receiver (and the receive interrupt) back on.
    fn enable(&mut self);

    fn set_baud_rate(&mut self, baud_rate: u32);

    fn set_framing(&mut self, framing: Framing);

    /// Drives the local ready (DTR) output. `true` is the ready level.
    fn set_ready_line(&mut self, ready: bool);

    /// Holds the TX pin at its idle level while the port is reconfigured.
    fn set_tx_idle_hold(&mut self, hold: bool);

    /// Samples the peer ready (DSR) input. `true` is the ready level.
    fn peer_line(&mut self) -> bool;
}
