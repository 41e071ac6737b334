use log::debug;

/// DTR/DSR-style flow control state.
///
/// The local ready line (DTR towards the peer) is driven from the host's explicit request and,
/// when enforcement is on, from backpressure on the serial-to-host queue. The peer ready line
/// (DSR from the peer) is only tracked here for edge-triggered reporting to the host.
///
/// Mutators return `Some(level)` when the local ready level changed and `None` otherwise, so the
/// line and its indicator are touched once per transition.
#[derive(Debug)]
pub struct FlowControl {
    enforce: bool,
    watermark: usize,
    host_request: bool,
    backpressure: bool,
    held: bool,
    local_ready: bool,
    reported_peer_ready: bool,
}

impl FlowControl {
    pub const fn new(enforce: bool, watermark: usize) -> Self {
        FlowControl {
            enforce,
            watermark,
            host_request: false,
            backpressure: false,
            held: false,
            local_ready: false,
            reported_peer_ready: false,
        }
    }

    pub fn enforced(&self) -> bool {
        self.enforce
    }

    pub fn local_ready(&self) -> bool {
        self.local_ready
    }

    pub fn backpressure(&self) -> bool {
        self.backpressure
    }

    pub fn reported_peer_ready(&self) -> bool {
        self.reported_peer_ready
    }

    /// Records the host's DTR request.
    pub fn set_host_request(&mut self, asserted: bool) -> Option<bool> {
        self.host_request = asserted;
        self.recompute()
    }

    /// Applies the watermarks to the serial-to-host queue occupancy. Ignored without enforcement.
    pub fn update_backpressure(&mut self, count: usize, free: usize) -> Option<bool> {
        if !self.enforce {
            return None;
        }

        if !self.backpressure && free < self.watermark {
            debug!("backpressure on ({} free)", free);
            self.backpressure = true;
        } else if self.backpressure && count < self.watermark {
            debug!("backpressure off ({} queued)", count);
            self.backpressure = false;
        }
        self.recompute()
    }

    /// Drops the backpressure latch after the serial-to-host queue has been emptied. The level
    /// is recomputed by the next `release` or mutator.
    pub fn reset_backpressure(&mut self) {
        self.backpressure = false;
    }

    /// Forces the local ready line inactive until `release`.
    pub fn hold(&mut self) -> Option<bool> {
        self.held = true;
        self.recompute()
    }

    pub fn release(&mut self) -> Option<bool> {
        self.held = false;
        self.recompute()
    }

    /// Whether the UART transmitter may send given the peer ready level.
    pub fn permits_transmit(&self, peer_ready: bool) -> bool {
        !self.enforce || peer_ready
    }

    /// Returns the level to report when `peer_ready` differs from what the host last accepted.
    pub fn peer_report(&self, peer_ready: bool) -> Option<bool> {
        (peer_ready != self.reported_peer_ready).then_some(peer_ready)
    }

    pub fn mark_reported(&mut self, peer_ready: bool) {
        self.reported_peer_ready = peer_ready;
    }

    fn recompute(&mut self) -> Option<bool> {
        let ready = !self.held && self.host_request && !(self.enforce && self.backpressure);
        if ready == self.local_ready {
            return None;
        }

        debug!("local ready {}", ready);
        self.local_ready = ready;
        Some(ready)
    }
}
