//! Recording doubles for the host port, UART, indicators and USB bus.

extern crate std;

use crate::host::{HostError, HostEvents, HostPort, SerialState};
use crate::line_coding::Framing;
use crate::serial::SerialDevice;
use crate::status::{Indicator, LinkStatus, StatusIndicators};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::vec::Vec;
use usb_device::bus::{PollResult, UsbBus, UsbBusAllocator};
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::{UsbDirection, UsbError};

pub struct MockHost {
    pub configured: bool,
    pub enumerating: bool,
    pub send_ready: bool,
    pub notify_ready: bool,
    /// Bytes `send_byte` still accepts before refusing. `None` accepts everything.
    pub accept_limit: Option<usize>,
    pub incoming: VecDeque<u8>,
    pub events: VecDeque<HostEvents>,
    pub sent: Vec<u8>,
    pub notifications: Vec<SerialState>,
}

impl MockHost {
    pub fn new() -> Self {
        MockHost {
            configured: false,
            enumerating: false,
            send_ready: true,
            notify_ready: true,
            accept_limit: None,
            incoming: VecDeque::new(),
            events: VecDeque::new(),
            sent: Vec::new(),
            notifications: Vec::new(),
        }
    }
}

impl HostPort for MockHost {
    fn poll(&mut self) -> HostEvents {
        self.events.pop_front().unwrap_or_default()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn link_status(&self) -> LinkStatus {
        match (self.configured, self.enumerating) {
            (true, _) => LinkStatus::Ready,
            (false, true) => LinkStatus::Enumerating,
            (false, false) => LinkStatus::NotReady,
        }
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.incoming.pop_front()
    }

    fn is_send_ready(&self) -> bool {
        self.send_ready
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), HostError> {
        if let Some(remaining) = self.accept_limit {
            if remaining == 0 {
                return Err(HostError::Busy);
            }
            self.accept_limit = Some(remaining - 1);
        }
        self.sent.push(byte);
        Ok(())
    }

    fn max_packet_size(&self) -> usize {
        64
    }

    fn notify_serial_state(&mut self, state: SerialState) -> Result<(), HostError> {
        if !self.notify_ready {
            return Err(HostError::Busy);
        }
        self.notifications.push(state);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialCall {
    Disable,
    Enable,
    BaudRate(u32),
    Framing(Framing),
    ReadyLine(bool),
    TxIdleHold(bool),
}

pub struct MockSerial {
    pub ready: bool,
    /// Writes fail with an error instead of `WouldBlock` while set.
    pub broken: bool,
    pub peer: bool,
    pub ready_line: Option<bool>,
    pub sent: Vec<u8>,
    pub calls: Vec<SerialCall>,
}

impl MockSerial {
    pub fn new() -> Self {
        MockSerial {
            ready: true,
            broken: false,
            peer: false,
            ready_line: None,
            sent: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl embedded_hal::serial::Write<u8> for MockSerial {
    type Error = ();

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.broken {
            return Err(nb::Error::Other(()));
        }
        if !self.ready {
            return Err(nb::Error::WouldBlock);
        }
        self.sent.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl SerialDevice for MockSerial {
    fn disable(&mut self) {
        self.calls.push(SerialCall::Disable);
    }

    fn enable(&mut self) {
        self.calls.push(SerialCall::Enable);
    }

    fn set_baud_rate(&mut self, baud_rate: u32) {
        self.calls.push(SerialCall::BaudRate(baud_rate));
    }

    fn set_framing(&mut self, framing: Framing) {
        self.calls.push(SerialCall::Framing(framing));
    }

    fn set_ready_line(&mut self, ready: bool) {
        self.ready_line = Some(ready);
        self.calls.push(SerialCall::ReadyLine(ready));
    }

    fn set_tx_idle_hold(&mut self, hold: bool) {
        self.calls.push(SerialCall::TxIdleHold(hold));
    }

    fn peer_line(&mut self) -> bool {
        self.peer
    }
}

#[derive(Default)]
pub struct MockIndicators {
    pub levels: [bool; 4],
    pub link: Option<LinkStatus>,
}

impl MockIndicators {
    pub fn level(&self, indicator: Indicator) -> bool {
        self.levels[indicator as usize]
    }
}

impl StatusIndicators for MockIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) {
        self.levels[indicator as usize] = on;
    }

    fn set_link(&mut self, status: LinkStatus) {
        self.link = Some(status);
    }
}

#[derive(Default)]
pub struct BusState {
    written: Mutex<Vec<(EndpointAddress, Vec<u8>)>>,
    stalled: Mutex<Vec<EndpointAddress>>,
    busy: Mutex<bool>,
    packets: Mutex<VecDeque<Vec<u8>>>,
    polls: Mutex<VecDeque<PollResult>>,
}

impl BusState {
    /// Every IN write so far, in order.
    pub fn written(&self) -> Vec<(EndpointAddress, Vec<u8>)> {
        self.written.lock().unwrap().clone()
    }

    pub fn stalled(&self) -> Vec<EndpointAddress> {
        self.stalled.lock().unwrap().clone()
    }

    /// Makes every write fail with `WouldBlock`.
    pub fn set_busy(&self, busy: bool) {
        *self.busy.lock().unwrap() = busy;
    }

    /// Queues an OUT packet for the next read on any endpoint.
    pub fn push_packet(&self, packet: &[u8]) {
        self.packets.lock().unwrap().push_back(packet.to_vec());
    }

    /// Delivers a SETUP packet on endpoint 0 with the next poll.
    pub fn push_setup(&self, request_type: u8, request: u8, value: u16, index: u16, length: u16) {
        let value = value.to_le_bytes();
        let index = index.to_le_bytes();
        let length = length.to_le_bytes();
        self.push_packet(&[
            request_type,
            request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]);
        self.polls.lock().unwrap().push_back(PollResult::Data {
            ep_out: 0,
            ep_in_complete: 0,
            ep_setup: 1,
        });
    }

    /// Delivers a data stage packet on endpoint 0 with the next poll.
    pub fn push_ep0_out(&self, data: &[u8]) {
        self.push_packet(data);
        self.polls.lock().unwrap().push_back(PollResult::Data {
            ep_out: 1,
            ep_in_complete: 0,
            ep_setup: 0,
        });
    }
}

/// Bus that records IN writes and stalls, and serves queued OUT packets and poll results.
pub struct FakeBus {
    next_ep: [usize; 2],
    state: Arc<BusState>,
}

pub fn fake_bus() -> (UsbBusAllocator<FakeBus>, Arc<BusState>) {
    let state = Arc::new(BusState::default());
    let bus = FakeBus {
        next_ep: [0; 2],
        state: state.clone(),
    };
    (UsbBusAllocator::new(bus), state)
}

impl UsbBus for FakeBus {
    fn alloc_ep(
        &mut self,
        ep_dir: UsbDirection,
        ep_addr: Option<EndpointAddress>,
        _ep_type: EndpointType,
        _max_packet_size: u16,
        _interval: u8,
    ) -> usb_device::Result<EndpointAddress> {
        if let Some(addr) = ep_addr {
            return Ok(addr);
        }
        let slot = &mut self.next_ep[(ep_dir == UsbDirection::In) as usize];
        *slot += 1;
        Ok(EndpointAddress::from_parts(*slot, ep_dir))
    }

    fn enable(&mut self) {}

    fn reset(&self) {}

    fn set_device_address(&self, _addr: u8) {}

    fn write(&self, ep_addr: EndpointAddress, buf: &[u8]) -> usb_device::Result<usize> {
        if *self.state.busy.lock().unwrap() {
            return Err(UsbError::WouldBlock);
        }
        self.state
            .written
            .lock()
            .unwrap()
            .push((ep_addr, buf.to_vec()));
        Ok(buf.len())
    }

    fn read(&self, _ep_addr: EndpointAddress, buf: &mut [u8]) -> usb_device::Result<usize> {
        match self.state.packets.lock().unwrap().pop_front() {
            Some(packet) => {
                buf[..packet.len()].copy_from_slice(&packet);
                Ok(packet.len())
            }
            None => Err(UsbError::WouldBlock),
        }
    }

    fn set_stalled(&self, ep_addr: EndpointAddress, stalled: bool) {
        if stalled {
            self.state.stalled.lock().unwrap().push(ep_addr);
        }
    }

    fn is_stalled(&self, _ep_addr: EndpointAddress) -> bool {
        false
    }

    fn suspend(&self) {}

    fn resume(&self) {}

    fn poll(&self) -> PollResult {
        self.state
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PollResult::None)
    }
}
