use log::warn;

/// Number of stop bits in a CDC line coding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopBits {
    /// 1 stop bit
    One = 0,

    /// 1.5 stop bits
    OnePointFive = 1,

    /// 2 stop bits
    Two = 2,
}

impl From<u8> for StopBits {
    fn from(value: u8) -> Self {
        match value {
            1 => StopBits::OnePointFive,
            2 => StopBits::Two,
            _ => StopBits::One,
        }
    }
}

/// Parity in a CDC line coding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParityType {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl From<u8> for ParityType {
    fn from(value: u8) -> Self {
        match value {
            1 => ParityType::Odd,
            2 => ParityType::Even,
            3 => ParityType::Mark,
            4 => ParityType::Space,
            _ => ParityType::None,
        }
    }
}

/// Line coding parameters as requested by the host.
///
/// This is provided by the host for specifying the standard UART parameters such as baud rate. Can
/// be ignored if you don't plan to interface with a physical UART.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineCoding {
    pub stop_bits: StopBits,
    pub data_bits: u8,
    pub parity_type: ParityType,
    pub data_rate: u32,
}

impl LineCoding {
    /// Serialises into the 7-byte GET_LINE_CODING layout.
    pub fn to_bytes(&self) -> [u8; 7] {
        let rate = self.data_rate.to_le_bytes();
        [
            rate[0],
            rate[1],
            rate[2],
            rate[3],
            self.stop_bits as u8,
            self.parity_type as u8,
            self.data_bits,
        ]
    }

    /// Parses the SET_LINE_CODING payload. Returns `None` if it is shorter than 7 bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match data {
            [r0, r1, r2, r3, stop, parity, bits, ..] => Some(LineCoding {
                data_rate: u32::from_le_bytes([*r0, *r1, *r2, *r3]),
                stop_bits: (*stop).into(),
                parity_type: (*parity).into(),
                data_bits: *bits,
            }),
            _ => None,
        }
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        LineCoding {
            stop_bits: StopBits::One,
            data_bits: 8,
            parity_type: ParityType::None,
            data_rate: 9_600,
        }
    }
}

/// Data bits per character a UART can be programmed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataBits {
    Six,
    Seven,
    Eight,
}

/// Parity a UART can generate and check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Stop bits a UART can generate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerialStopBits {
    One,
    Two,
}

/// Character framing of the physical UART.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Framing {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: SerialStopBits,
}

impl Default for Framing {
    fn default() -> Self {
        Framing {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: SerialStopBits::One,
        }
    }
}

/// Complete UART configuration derived from a host line coding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub framing: Framing,
}

impl SerialConfig {
    /// Maps a host line coding onto the nearest configuration a UART supports.
    ///
    /// The host has no way to learn that a request was unsupported, so this never fails: mark and
    /// space parity become no parity, 1.5 stop bits become one, and data bits are clamped to 6..=8.
    pub fn from_line_coding(coding: &LineCoding) -> Self {
        let parity = match coding.parity_type {
            ParityType::None => Parity::None,
            ParityType::Odd => Parity::Odd,
            ParityType::Even => Parity::Even,
            other => {
                warn!("unsupported parity {:?}, using none", other);
                Parity::None
            }
        };

        let stop_bits = match coding.stop_bits {
            StopBits::One => SerialStopBits::One,
            StopBits::Two => SerialStopBits::Two,
            StopBits::OnePointFive => {
                warn!("1.5 stop bits unsupported, using one");
                SerialStopBits::One
            }
        };

        let data_bits = match coding.data_bits {
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            n if n < 6 => {
                warn!("{} data bits unsupported, using 6", n);
                DataBits::Six
            }
            n => {
                warn!("{} data bits unsupported, using 8", n);
                DataBits::Eight
            }
        };

        SerialConfig {
            baud_rate: coding.data_rate,
            framing: Framing {
                data_bits,
                parity,
                stop_bits,
            },
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::from_line_coding(&LineCoding::default())
    }
}

/// Rounded baud rate divisor for a UART running in double-speed (8x oversampling) mode.
///
/// Saturates instead of overflowing for rates the clock cannot reach. A zero baud rate yields the
/// slowest divisor.
pub const fn clock_divider_2x(clock_hz: u32, baud_rate: u32) -> u16 {
    if baud_rate == 0 {
        return u16::MAX;
    }

    let divider = ((clock_hz / 8) + (baud_rate / 2)) / baud_rate;
    if divider == 0 {
        0
    } else if divider - 1 > u16::MAX as u32 {
        u16::MAX
    } else {
        (divider - 1) as u16
    }
}
