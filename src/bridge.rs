use crate::config::BridgeConfig;
use crate::flow::FlowControl;
use crate::host::{ControlLines, HostEvents, HostPort, SerialState};
use crate::line_coding::{LineCoding, SerialConfig};
use crate::serial::SerialDevice;
use crate::shared::BridgeShared;
use crate::status::{Indicator, LinkStatus, StatusIndicators};
use core::cmp;
use log::{debug, info, trace, warn};

/// The pump loop tying a host port to a UART.
///
/// Call [`pump`](Bridge::pump) as often as possible from the main loop. Each call does a bounded
/// amount of work and never blocks.
pub struct Bridge<'s, H, U, S, const N: usize>
where
    H: HostPort,
    U: SerialDevice,
    S: StatusIndicators,
{
    host: H,
    serial: U,
    indicators: S,
    shared: &'s BridgeShared<N>,
    config: BridgeConfig,
    flow: FlowControl,
    serial_config: SerialConfig,
    link: LinkStatus,
    link_up: bool,
    serial_failing: bool,
}

impl<'s, H, U, S, const N: usize> Bridge<'s, H, U, S, N>
where
    H: HostPort,
    U: SerialDevice,
    S: StatusIndicators,
{
    /// Creates the bridge with both lines not ready and the queues empty.
    pub fn new(
        host: H,
        mut serial: U,
        mut indicators: S,
        shared: &'s BridgeShared<N>,
        config: BridgeConfig,
    ) -> Self {
        shared.set_configured(false);
        shared.host_to_serial.clear();
        shared.serial_to_host.clear();

        serial.set_ready_line(false);
        indicators.set(Indicator::LocalReady, false);
        indicators.set_link(LinkStatus::NotReady);

        Bridge {
            host,
            serial,
            indicators,
            shared,
            config,
            flow: FlowControl::new(config.enforce_flow_control, config.watermark),
            serial_config: SerialConfig::default(),
            link: LinkStatus::NotReady,
            link_up: false,
            serial_failing: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn serial(&self) -> &U {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut U {
        &mut self.serial
    }

    pub fn indicators(&self) -> &S {
        &self.indicators
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The UART configuration most recently applied.
    pub fn serial_config(&self) -> &SerialConfig {
        &self.serial_config
    }

    pub fn local_ready(&self) -> bool {
        self.flow.local_ready()
    }

    pub fn into_parts(self) -> (H, U, S) {
        (self.host, self.serial, self.indicators)
    }

    /// Runs one iteration of the bridge.
    pub fn pump(&mut self) {
        let events = self.host.poll();
        self.handle_events(events);

        if !self.update_link() {
            return;
        }

        self.receive_from_host();
        self.send_to_host();

        self.indicators
            .set(Indicator::HostInbound, !self.shared.serial_to_host.is_empty());
        self.indicators
            .set(Indicator::HostOutbound, !self.shared.host_to_serial.is_empty());

        let peer_ready = self.shared.peer_ready();
        self.indicators.set(Indicator::PeerReady, peer_ready);

        if self.flow.enforced() {
            let (count, free) = self
                .shared
                .serial_to_host
                .with(|q| (q.count(), q.free_count()));
            let change = self.flow.update_backpressure(count, free);
            self.drive_local_ready(change);
        }

        if self.flow.permits_transmit(peer_ready) {
            self.send_to_serial();
        }

        self.report_peer_ready(peer_ready);
    }

    /// Applies a host SET_CONTROL_LINE_STATE request.
    pub fn set_control_lines(&mut self, lines: ControlLines) {
        debug!("control lines {:?}", lines);
        let change = self.flow.set_host_request(lines.dtr);
        self.drive_local_ready(change);
    }

    /// Reconfigures the UART for a new host line coding.
    ///
    /// Runs to completion inside one critical section, so the receive interrupt cannot insert
    /// bytes framed under either configuration while the port is switched over. Both queues are
    /// emptied.
    pub fn reconfigure(&mut self, coding: LineCoding) {
        let config = SerialConfig::from_line_coding(&coding);
        info!(
            "line coding {} baud {:?}",
            config.baud_rate, config.framing
        );

        let shared = self.shared;
        let serial = &mut self.serial;
        let flow = &mut self.flow;

        let change = critical_section::with(|cs| {
            if flow.hold().is_some() {
                serial.set_ready_line(false);
            }
            serial.set_tx_idle_hold(true);

            serial.disable();
            serial.set_baud_rate(config.baud_rate);
            serial.set_framing(config.framing);
            serial.enable();

            shared.host_to_serial.with_in(cs, |q| q.clear());
            shared.serial_to_host.with_in(cs, |q| q.clear());
            flow.reset_backpressure();

            serial.set_tx_idle_hold(false);
            flow.release()
        });

        self.serial_config = config;
        self.drive_local_ready(change);
    }

    fn handle_events(&mut self, events: HostEvents) {
        if events.is_empty() {
            return;
        }

        if let Some(coding) = events.line_coding {
            self.reconfigure(coding);
        }
        if let Some(lines) = events.control_lines {
            self.set_control_lines(lines);
        }
    }

    /// Tracks the host link state. Returns whether data may move this iteration.
    fn update_link(&mut self) -> bool {
        let status = self.host.link_status();
        if status != self.link {
            debug!("host link {:?}", status);
            self.link = status;
            self.indicators.set_link(status);
        }

        let up = self.host.is_configured();
        if up != self.link_up {
            self.link_up = up;
            self.shared.set_configured(up);
            if up {
                let level = self.serial.peer_line();
                self.shared.on_peer_line(level);
            }
        }
        up
    }

    fn receive_from_host(&mut self) {
        let queue = &self.shared.host_to_serial;
        if queue.is_full() {
            return;
        }

        if let Some(byte) = self.host.receive_byte() {
            queue.insert(byte);
        }
    }

    fn send_to_host(&mut self) {
        let queue = &self.shared.serial_to_host;
        let count = queue.count();
        if count == 0 || !self.host.is_send_ready() {
            return;
        }

        let limit = self
            .host
            .max_packet_size()
            .saturating_sub(self.config.packet_margin);

        for _ in 0..cmp::min(count, limit) {
            let Some(byte) = queue.peek() else {
                break;
            };

            // Only dequeue once the host side took the byte.
            if self.host.send_byte(byte).is_err() {
                break;
            }
            queue.try_remove();
        }
    }

    fn send_to_serial(&mut self) {
        let queue = &self.shared.host_to_serial;
        let Some(byte) = queue.peek() else {
            return;
        };

        match self.serial.write(byte) {
            Ok(()) => {
                queue.try_remove();
                self.serial_failing = false;
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(_)) => {
                // Warn once per run of failures; the byte stays queued either way.
                if !self.serial_failing {
                    warn!("uart write failed, retrying");
                }
                self.serial_failing = true;
            }
        }
    }

    fn report_peer_ready(&mut self, peer_ready: bool) {
        let Some(level) = self.flow.peer_report(peer_ready) else {
            return;
        };

        let state = SerialState {
            dcd: level,
            dsr: level,
        };
        match self.host.notify_serial_state(state) {
            Ok(()) => self.flow.mark_reported(level),
            Err(e) => trace!("serial state notification deferred: {}", e),
        }
    }

    fn drive_local_ready(&mut self, change: Option<bool>) {
        if let Some(ready) = change {
            self.serial.set_ready_line(ready);
            self.indicators.set(Indicator::LocalReady, ready);
        }
    }
}
