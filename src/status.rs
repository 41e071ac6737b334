/// Level signals shown to the user, typically on LEDs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Indicator {
    /// Bytes from the UART are waiting for the host.
    HostInbound,

    /// Bytes from the host are waiting for the UART.
    HostOutbound,

    PeerReady,

    LocalReady,
}

/// State of the host link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    /// Detached, suspended or not yet reset by the host.
    NotReady,

    /// Attached and being enumerated, not configured yet.
    Enumerating,

    Ready,
}

pub trait StatusIndicators {
    fn set(&mut self, indicator: Indicator, on: bool);

    fn set_link(&mut self, _status: LinkStatus) {}
}

/// Indicators that show nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIndicators;

impl StatusIndicators for NoIndicators {
    fn set(&mut self, _indicator: Indicator, _on: bool) {}
}
