use crate::host::{ControlLines, HostEvents, SerialState};
use crate::line_coding::LineCoding;
use usb_device::class_prelude::*;
use usb_device::control::{Recipient, Request, RequestType};
use usb_device::Result;

/// This should be used as `device_class` when building the `UsbDevice`.
pub const USB_CLASS_CDC: u8 = 0x02;

const USB_CLASS_CDC_DATA: u8 = 0x0a;
const CDC_SUBCLASS_ACM: u8 = 0x02;
const CDC_PROTOCOL_NONE: u8 = 0x00;

const CS_INTERFACE: u8 = 0x24;
const CDC_TYPE_HEADER: u8 = 0x00;
const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
const CDC_TYPE_ACM: u8 = 0x02;
const CDC_TYPE_UNION: u8 = 0x06;

/// bmCapabilities: SET/GET_LINE_CODING, SET_CONTROL_LINE_STATE and SERIAL_STATE.
const ACM_CAP_LINE_CODING: u8 = 0x02;
/// bmCapabilities: SEND_BREAK.
const ACM_CAP_SEND_BREAK: u8 = 0x04;

const REQ_SEND_ENCAPSULATED_COMMAND: u8 = 0x00;
const REQ_SET_LINE_CODING: u8 = 0x20;
const REQ_GET_LINE_CODING: u8 = 0x21;
const REQ_SET_CONTROL_LINE_STATE: u8 = 0x22;
const REQ_SEND_BREAK: u8 = 0x23;

const NOTIFY_SERIAL_STATE: u8 = 0x20;
const NOTIFICATION_REQUEST_TYPE: u8 = 0xa1;
const NOTIFICATION_PACKET_SIZE: u16 = 16;

/// Packet level implementation of a CDC-ACM serial port.
///
/// Keeps the line coding and control line state the host last set, and records each change as a
/// pending event until [`take_events`](CdcAcmClass::take_events) collects it.
pub struct CdcAcmClass<'a, B: UsbBus> {
    comm_if: InterfaceNumber,
    comm_ep: EndpointIn<'a, B>,
    data_if: InterfaceNumber,
    read_ep: EndpointOut<'a, B>,
    write_ep: EndpointIn<'a, B>,
    line_coding: LineCoding,
    control_lines: ControlLines,
    events: HostEvents,
}

impl<B: UsbBus> CdcAcmClass<'_, B> {
    /// Creates a new CdcAcmClass with the provided UsbBus and max_packet_size in bytes. For
    /// full-speed devices, max_packet_size has to be one of 8, 16, 32 or 64.
    pub fn new(alloc: &UsbBusAllocator<B>, max_packet_size: u16) -> CdcAcmClass<'_, B> {
        CdcAcmClass {
            comm_if: alloc.interface(),
            comm_ep: alloc.interrupt(NOTIFICATION_PACKET_SIZE, 255),
            data_if: alloc.interface(),
            read_ep: alloc.bulk(max_packet_size),
            write_ep: alloc.bulk(max_packet_size),
            line_coding: LineCoding::default(),
            control_lines: ControlLines::default(),
            events: HostEvents::default(),
        }
    }

    /// Gets the maximum packet size in bytes.
    pub fn max_packet_size(&self) -> u16 {
        // The size is the same for both endpoints.
        self.read_ep.max_packet_size()
    }

    /// Gets the current line coding.
    pub fn line_coding(&self) -> &LineCoding {
        &self.line_coding
    }

    /// Gets the control line state last set by the host.
    pub fn control_lines(&self) -> ControlLines {
        self.control_lines
    }

    /// Takes the host requests received since the last call.
    pub fn take_events(&mut self) -> HostEvents {
        core::mem::take(&mut self.events)
    }

    /// Writes a single packet into the IN endpoint.
    pub fn write_packet(&mut self, data: &[u8]) -> Result<usize> {
        self.write_ep.write(data)
    }

    /// Reads a single packet from the OUT endpoint.
    pub fn read_packet(&mut self, data: &mut [u8]) -> Result<usize> {
        self.read_ep.read(data)
    }

    /// Sends a SERIAL_STATE notification on the interrupt endpoint.
    pub fn send_serial_state(&mut self, state: SerialState) -> Result<()> {
        let bits = state.bits().to_le_bytes();
        let packet = [
            NOTIFICATION_REQUEST_TYPE,
            NOTIFY_SERIAL_STATE,
            0,
            0,
            u8::from(self.comm_if),
            0,
            2,
            0,
            bits[0],
            bits[1],
        ];
        self.comm_ep.write(&packet).map(|_| ())
    }

    pub(crate) fn write_ep_address(&self) -> EndpointAddress {
        self.write_ep.address()
    }

    /// Applies a class OUT request. Returns `None` if the request is not addressed to this
    /// interface, otherwise whether it was accepted.
    fn handle_out_request(&mut self, req: &Request, data: &[u8]) -> Option<bool> {
        if !self.is_comm_request(req) {
            return None;
        }

        let accepted = match req.request {
            // We don't actually support encapsulated commands or breaks but pretend we do for
            // standards compatibility.
            REQ_SEND_ENCAPSULATED_COMMAND | REQ_SEND_BREAK => true,
            REQ_SET_LINE_CODING => match LineCoding::from_bytes(data) {
                Some(coding) => {
                    self.line_coding = coding;
                    self.events.line_coding = Some(coding);
                    true
                }
                None => false,
            },
            REQ_SET_CONTROL_LINE_STATE => {
                let lines = ControlLines::from_value(req.value);
                self.control_lines = lines;
                self.events.control_lines = Some(lines);
                true
            }
            _ => false,
        };
        Some(accepted)
    }

    fn is_comm_request(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == u8::from(self.comm_if) as u16
    }
}

impl<B: UsbBus> UsbClass<B> for CdcAcmClass<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        writer.iad(
            self.comm_if,
            2,
            USB_CLASS_CDC,
            CDC_SUBCLASS_ACM,
            CDC_PROTOCOL_NONE,
            None,
        )?;

        writer.interface(
            self.comm_if,
            USB_CLASS_CDC,
            CDC_SUBCLASS_ACM,
            CDC_PROTOCOL_NONE,
        )?;

        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_HEADER, // bDescriptorSubtype
                0x10,
                0x01, // bcdCDC (1.10)
            ],
        )?;

        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_ACM,                             // bDescriptorSubtype
                ACM_CAP_LINE_CODING | ACM_CAP_SEND_BREAK, // bmCapabilities
            ],
        )?;

        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_UNION,      // bDescriptorSubtype
                self.comm_if.into(), // bControlInterface
                self.data_if.into(), // bSubordinateInterface
            ],
        )?;

        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_CALL_MANAGEMENT, // bDescriptorSubtype
                0x00,                     // bmCapabilities
                self.data_if.into(),      // bDataInterface
            ],
        )?;

        writer.endpoint(&self.comm_ep)?;

        writer.interface(self.data_if, USB_CLASS_CDC_DATA, 0x00, 0x00)?;

        writer.endpoint(&self.write_ep)?;
        writer.endpoint(&self.read_ep)?;

        Ok(())
    }

    fn reset(&mut self) {
        self.line_coding = LineCoding::default();
        self.control_lines = ControlLines::default();
        self.events = HostEvents::default();
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = xfer.request();

        if !self.is_comm_request(req) {
            return;
        }

        match (req.request, req.length) {
            // REQ_GET_ENCAPSULATED_COMMAND is not really supported - it will be rejected below.
            (REQ_GET_LINE_CODING, 7) => {
                let bytes = self.line_coding.to_bytes();
                xfer.accept(|data| {
                    data[..7].copy_from_slice(&bytes);
                    Ok(7)
                })
                .ok();
            }
            _ => {
                xfer.reject().ok();
            }
        }
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        let accepted = self.handle_out_request(&req, xfer.data());

        match accepted {
            Some(true) => {
                xfer.accept().ok();
            }
            Some(false) => {
                xfer.reject().ok();
            }
            None => {}
        }
    }
}
