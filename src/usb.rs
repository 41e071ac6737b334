use crate::buffer::Buffer;
use crate::cdc_acm::CdcAcmClass;
use crate::host::{HostError, HostEvents, HostPort, SerialState};
use crate::status::LinkStatus;
use log::warn;
use usb_device::class_prelude::*;
use usb_device::device::{UsbDevice, UsbDeviceState};
use usb_device::Result;

/// Largest bulk packet on a full-speed device.
pub const MAX_PACKET_SIZE: usize = 64;

#[derive(Debug, Eq, PartialEq)]
enum WriteState {
    /// Not currently writing anything.
    Idle = 0,

    /// Writing a short packet.
    WriteShort = 1,

    /// Writing a full packet that needs to be followed by a short packet.
    WriteFull = 2,
}

/// CDC-ACM class with one packet of staging in each direction.
///
/// Received packets are handed out one byte at a time. Bytes to send are collected into a packet
/// which goes out on the next [`flush`](CdcPort::flush); while it is in flight the port is not
/// send ready.
pub struct CdcPort<'a, B: UsbBus> {
    inner: CdcAcmClass<'a, B>,
    read_buf: Buffer<[u8; MAX_PACKET_SIZE]>,
    write_buf: Buffer<[u8; MAX_PACKET_SIZE]>,
    write_state: WriteState,
}

impl<'a, B: UsbBus> CdcPort<'a, B> {
    /// Creates a new port with full-speed sized bulk endpoints on the provided UsbBus.
    pub fn new(alloc: &'a UsbBusAllocator<B>) -> CdcPort<'a, B> {
        CdcPort {
            inner: CdcAcmClass::new(alloc, MAX_PACKET_SIZE as u16),
            read_buf: Buffer::new([0; MAX_PACKET_SIZE]),
            write_buf: Buffer::new([0; MAX_PACKET_SIZE]),
            write_state: WriteState::Idle,
        }
    }

    pub fn class(&self) -> &CdcAcmClass<'a, B> {
        &self.inner
    }

    pub fn max_packet_size(&self) -> usize {
        self.inner.max_packet_size() as usize
    }

    /// Returns the next received byte, reading a new packet from the endpoint when the previous
    /// one is used up.
    pub fn receive_byte(&mut self) -> Option<u8> {
        if self.read_buf.available_read() == 0 {
            let inner = &mut self.inner;
            let filled = self.read_buf.write_all(MAX_PACKET_SIZE, |data| {
                match inner.read_packet(data) {
                    Ok(count) => Ok(count),
                    Err(UsbError::WouldBlock) => Ok(0),
                    Err(err) => Err(err),
                }
            });
            if let Err(err) = filled {
                warn!("usb read failed: {:?}", err);
            }
        }

        self.read_buf.pop()
    }

    /// Whether a new packet can be started: nothing staged and nothing in flight.
    pub fn is_send_ready(&self) -> bool {
        self.write_state == WriteState::Idle && self.write_buf.available_read() == 0
    }

    /// Stages a byte for the next packet.
    pub fn send_byte(&mut self, byte: u8) -> core::result::Result<(), HostError> {
        if self.write_state != WriteState::Idle
            || self.write_buf.available_read() >= self.max_packet_size()
            || !self.write_buf.push(byte)
        {
            return Err(HostError::Busy);
        }
        Ok(())
    }

    /// Sends the staged packet. Returns `Ok` once everything has been transferred to and
    /// acknowledged by the host, `Err(WouldBlock)` while data is still outstanding.
    pub fn flush(&mut self) -> Result<()> {
        let buf = &mut self.write_buf;

        if buf.available_read() > 0 && self.write_state == WriteState::Idle {
            let inner = &mut self.inner;
            let write_state = &mut self.write_state;
            let max_packet_size = inner.max_packet_size() as usize;

            buf.read(max_packet_size, |buf_data| {
                match inner.write_packet(buf_data) {
                    Ok(_) => {
                        *write_state = if buf_data.len() == max_packet_size {
                            WriteState::WriteFull
                        } else {
                            WriteState::WriteShort
                        };

                        Ok(buf_data.len())
                    }
                    Err(UsbError::WouldBlock) => Ok(0),
                    Err(err) => Err(err),
                }
            })?;
        }

        if self.write_state == WriteState::Idle && self.write_buf.available_read() == 0 {
            Ok(())
        } else {
            Err(UsbError::WouldBlock)
        }
    }

    pub fn send_serial_state(&mut self, state: SerialState) -> core::result::Result<(), HostError> {
        self.inner.send_serial_state(state).map_err(From::from)
    }

    pub fn take_events(&mut self) -> HostEvents {
        self.inner.take_events()
    }
}

impl<B: UsbBus> UsbClass<B> for CdcPort<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        self.inner.get_configuration_descriptors(writer)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.read_buf.clear();
        self.write_buf.clear();
        self.write_state = WriteState::Idle;
    }

    fn poll(&mut self) {
        self.flush().ok();
    }

    fn endpoint_in_complete(&mut self, addr: EndpointAddress) {
        if addr == self.inner.write_ep_address() {
            match self.write_state {
                WriteState::WriteFull => {
                    self.write_state = WriteState::WriteShort;
                    self.inner.write_packet(&[]).ok();
                }
                WriteState::WriteShort => {
                    self.write_state = WriteState::Idle;
                }
                WriteState::Idle => {}
            }
        }
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        self.inner.control_in(xfer);
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        self.inner.control_out(xfer);
    }
}

/// [`HostPort`] over a usb-device `UsbDevice` running a [`CdcPort`].
pub struct UsbHost<'a, B: UsbBus> {
    device: UsbDevice<'a, B>,
    port: CdcPort<'a, B>,
}

impl<'a, B: UsbBus> UsbHost<'a, B> {
    pub fn new(device: UsbDevice<'a, B>, port: CdcPort<'a, B>) -> Self {
        UsbHost { device, port }
    }

    pub fn device(&self) -> &UsbDevice<'a, B> {
        &self.device
    }

    pub fn port(&self) -> &CdcPort<'a, B> {
        &self.port
    }

    pub fn into_parts(self) -> (UsbDevice<'a, B>, CdcPort<'a, B>) {
        (self.device, self.port)
    }
}

impl<B: UsbBus> HostPort for UsbHost<'_, B> {
    fn poll(&mut self) -> HostEvents {
        self.device.poll(&mut [&mut self.port]);

        match self.port.flush() {
            Ok(()) | Err(UsbError::WouldBlock) => {}
            Err(err) => warn!("usb write failed: {:?}", err),
        }
        self.port.take_events()
    }

    fn is_configured(&self) -> bool {
        self.device.state() == UsbDeviceState::Configured
    }

    fn link_status(&self) -> LinkStatus {
        match self.device.state() {
            UsbDeviceState::Configured => LinkStatus::Ready,
            UsbDeviceState::Default | UsbDeviceState::Addressed => LinkStatus::Enumerating,
            UsbDeviceState::Suspend => LinkStatus::NotReady,
        }
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.port.receive_byte()
    }

    fn is_send_ready(&self) -> bool {
        self.port.is_send_ready()
    }

    fn send_byte(&mut self, byte: u8) -> core::result::Result<(), HostError> {
        self.port.send_byte(byte)
    }

    fn max_packet_size(&self) -> usize {
        self.port.max_packet_size()
    }

    fn notify_serial_state(&mut self, state: SerialState) -> core::result::Result<(), HostError> {
        self.port.send_serial_state(state)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{CdcPort, UsbHost};
    use crate::host::{ControlLines, HostError, HostPort, SerialState};
    use crate::line_coding::{LineCoding, ParityType, StopBits};
    use crate::mock::{fake_bus, FakeBus};
    use crate::status::LinkStatus;
    use std::vec::Vec;
    use usb_device::class_prelude::*;
    use usb_device::device::{UsbDevice, UsbDeviceBuilder, UsbVidPid};

    // bmRequestType for class requests to an interface.
    const CLASS_OUT: u8 = 0x21;
    const CLASS_IN: u8 = 0xa1;

    // Endpoints only reach the bus once a device has been built on the allocator, so the device
    // is returned to keep it alive for the test.
    fn port_with_write_ep(
        alloc: &UsbBusAllocator<FakeBus>,
    ) -> (CdcPort<'_, FakeBus>, UsbDevice<'_, FakeBus>, EndpointAddress) {
        let port = CdcPort::new(alloc);
        let device = UsbDeviceBuilder::new(alloc, UsbVidPid(0x16c0, 0x27dd)).build();
        let addr = port.class().write_ep_address();
        (port, device, addr)
    }

    fn host(alloc: &UsbBusAllocator<FakeBus>) -> UsbHost<'_, FakeBus> {
        let (port, device, _) = port_with_write_ep(alloc);
        UsbHost::new(device, port)
    }

    #[test]
    fn staged_bytes_go_out_as_one_packet() {
        let (alloc, state) = fake_bus();
        let (mut port, _device, write_ep) = port_with_write_ep(&alloc);

        assert!(port.is_send_ready());
        for b in 0..10 {
            assert_eq!(port.send_byte(b), Ok(()));
        }
        assert!(!port.is_send_ready());

        assert!(port.flush().is_err());
        assert_eq!(
            state.written(),
            [(write_ep, (0..10).collect::<Vec<u8>>())]
        );

        // In flight until the host acknowledges it.
        assert_eq!(port.send_byte(10), Err(HostError::Busy));
        port.endpoint_in_complete(write_ep);
        assert!(port.is_send_ready());
        assert!(port.flush().is_ok());
    }

    #[test]
    fn full_packet_is_terminated() {
        let (alloc, state) = fake_bus();
        let (mut port, _device, write_ep) = port_with_write_ep(&alloc);

        for b in 0..64 {
            assert_eq!(port.send_byte(b), Ok(()));
        }
        assert_eq!(port.send_byte(64), Err(HostError::Busy));
        port.flush().ok();

        port.endpoint_in_complete(write_ep);
        assert!(!port.is_send_ready());
        port.endpoint_in_complete(write_ep);
        assert!(port.is_send_ready());

        let packets = state.written();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].1.len(), 64);
        assert!(packets[1].1.is_empty());
    }

    #[test]
    fn busy_endpoint_keeps_staged_bytes() {
        let (alloc, state) = fake_bus();
        let (mut port, _device, _) = port_with_write_ep(&alloc);
        state.set_busy(true);

        port.send_byte(1).unwrap();
        port.send_byte(2).unwrap();
        assert!(port.flush().is_err());
        assert!(state.written().is_empty());

        state.set_busy(false);
        port.flush().ok();
        assert_eq!(state.written()[0].1, [1, 2]);
    }

    #[test]
    fn received_packets_are_split_into_bytes() {
        let (alloc, state) = fake_bus();
        let (mut port, _device, _) = port_with_write_ep(&alloc);
        state.push_packet(&[1, 2, 3]);
        state.push_packet(&[4]);

        let received: Vec<u8> = core::iter::from_fn(|| port.receive_byte()).collect();
        assert_eq!(received, [1, 2, 3, 4]);
        assert_eq!(port.receive_byte(), None);
    }

    #[test]
    fn serial_state_notification() {
        let (alloc, state) = fake_bus();
        let (mut port, _device, write_ep) = port_with_write_ep(&alloc);

        port.send_serial_state(SerialState {
            dcd: true,
            dsr: true,
        })
        .unwrap();

        let packets = state.written();
        assert_eq!(packets.len(), 1);
        assert_ne!(packets[0].0, write_ep);
        assert_eq!(packets[0].1, [0xa1, 0x20, 0, 0, 0, 0, 2, 0, 0x03, 0x00]);
    }

    #[test]
    fn host_link_status() {
        let (alloc, _) = fake_bus();
        let host = host(&alloc);

        assert!(!host.is_configured());
        assert_eq!(host.link_status(), LinkStatus::Enumerating);
        assert_eq!(host.max_packet_size(), 64);
    }

    #[test]
    fn host_reports_control_line_state() {
        let (alloc, state) = fake_bus();
        let mut host = host(&alloc);

        assert!(host.poll().is_empty());

        state.push_setup(CLASS_OUT, 0x22, 0x0001, 0, 0);
        let events = host.poll();
        assert_eq!(
            events.control_lines,
            Some(ControlLines {
                dtr: true,
                rts: false
            })
        );
        assert_eq!(events.line_coding, None);

        // Status stage acknowledged with a zero length packet on EP0 IN.
        let written = state.written();
        assert_eq!(written.last(), Some(&(EndpointAddress::from(0x80), Vec::new())));

        assert!(host.poll().is_empty());
    }

    #[test]
    fn host_reports_line_coding() {
        let (alloc, state) = fake_bus();
        let mut host = host(&alloc);
        let coding = LineCoding {
            stop_bits: StopBits::One,
            data_bits: 8,
            parity_type: ParityType::Even,
            data_rate: 57_600,
        };

        state.push_setup(CLASS_OUT, 0x20, 0, 0, 7);
        assert!(host.poll().is_empty());
        state.push_ep0_out(&coding.to_bytes());
        assert_eq!(host.poll().line_coding, Some(coding));

        state.push_setup(CLASS_IN, 0x21, 0, 0, 7);
        host.poll();
        let written = state.written();
        assert_eq!(
            written.last(),
            Some(&(EndpointAddress::from(0x80), coding.to_bytes().to_vec()))
        );
    }

    #[test]
    fn host_rejects_short_line_coding() {
        let (alloc, state) = fake_bus();
        let mut host = host(&alloc);

        state.push_setup(CLASS_OUT, 0x20, 0, 0, 6);
        host.poll();
        state.push_ep0_out(&[0x80, 0x25, 0, 0, 0, 0]);
        assert!(host.poll().is_empty());

        assert!(state.stalled().contains(&EndpointAddress::from(0x80)));
        assert_eq!(host.port().class().line_coding(), &LineCoding::default());
    }

    #[test]
    fn host_ignores_other_interface() {
        let (alloc, state) = fake_bus();
        let mut host = host(&alloc);

        state.push_setup(CLASS_OUT, 0x22, 0x0001, 1, 0);
        assert!(host.poll().is_empty());
        assert_eq!(host.port().class().control_lines(), ControlLines::default());
    }
}
