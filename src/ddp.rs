use crate::error::{Result, SimError};
use crate::pixels::PixelBuffer;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt::Write as _;
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// Default DDP port.
pub const DDP_PORT: u16 = 4048;

/// Largest datagram read in one receive call.
pub const MAX_DATAGRAM: usize = 1500;

/// DDP header length. Header fields are skipped, never validated.
pub const HEADER_LEN: usize = 10;

/// Bytes shown by [`dump_line`]: the header plus the first pixel.
const DUMP_LEN: usize = HEADER_LEN + 3;

/// Winsock's "message too long", reported when a datagram overflows the read buffer.
const WSAEMSGSIZE: i32 = 10040;

/// DDP header fields, as written by senders.
///
/// The receiver skips the header, so this is only used to build datagrams
/// for testing a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdpHeader {
    /// Mark the last datagram of a frame.
    pub push: bool,
    /// Sequence number, 1-15 (0 means "not used").
    pub sequence: u8,
    /// Byte offset of the payload within the frame.
    pub offset: u32,
    /// Payload length in bytes.
    pub length: u16,
}

impl DdpHeader {
    /// Version 1 in the top two bits.
    const VERSION: u8 = 0x40;
    const PUSH: u8 = 0x01;
    /// RGB, 8 bits per channel.
    const DATA_TYPE_RGB8: u8 = 0x0b;
    /// Default output device.
    const ID_DISPLAY: u8 = 0x01;

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];

        // Flags: version + push
        buf[0] = Self::VERSION | if self.push { Self::PUSH } else { 0 };

        // Sequence (low nibble)
        buf[1] = self.sequence & 0x0f;

        buf[2] = Self::DATA_TYPE_RGB8;
        buf[3] = Self::ID_DISPLAY;

        // Offset (u32 BE)
        buf[4..8].copy_from_slice(&self.offset.to_be_bytes());

        // Length (u16 BE)
        buf[8..10].copy_from_slice(&self.length.to_be_bytes());

        buf
    }

    /// Header plus `payload` as one datagram.
    pub fn datagram(sequence: u8, payload: &[u8]) -> Vec<u8> {
        let header = DdpHeader {
            push: true,
            sequence,
            offset: 0,
            length: payload.len().min(u16::MAX as usize) as u16,
        };
        let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
        packet.extend_from_slice(&header.to_bytes());
        packet.extend_from_slice(payload);
        packet
    }
}

/// Outcome of one non-blocking poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// Nothing was waiting on the socket.
    NoData,
    /// A datagram arrived; carries the number of payload bytes copied into
    /// the pixel buffer (0 for a header-only or runt datagram).
    Received(usize),
    /// The receive call was interrupted by a signal. The socket is fine.
    Interrupted,
}

/// Payload of a DDP datagram: everything after the 10 byte header.
pub fn payload(datagram: &[u8]) -> &[u8] {
    datagram.get(HEADER_LEN..).unwrap_or(&[])
}

/// Copies the datagram payload into `pixels` starting at pixel 0.
///
/// Returns the number of bytes copied after clamping to the buffer size.
pub fn decode_into(datagram: &[u8], pixels: &mut PixelBuffer) -> usize {
    pixels.write_from(payload(datagram))
}

/// Formats the packet dump line for `datagram`, of which `copied` payload
/// bytes made it into the pixel buffer.
pub fn dump_line(datagram: &[u8], copied: usize) -> String {
    let mut line = String::from("DDP: ");
    for i in 0..DUMP_LEN {
        if i == HEADER_LEN {
            line.push(' ');
        }
        match datagram.get(i) {
            Some(b) => {
                let _ = write!(line, "{b:02x}");
            }
            None => line.push_str("--"),
        }
    }
    let _ = write!(line, " ... (len: {}, {} pixel)", datagram.len(), copied / 3);
    line
}

/// Decides which data packets get a dump line.
///
/// Only datagrams that carried pixel data are counted, so header-only
/// datagrams never shift the cadence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketDumper {
    every: u64,
    seen: u64,
}

impl PacketDumper {
    /// Dumps every `every`th data packet; 0 disables dumping.
    pub fn new(every: u64) -> Self {
        Self { every, seen: 0 }
    }

    /// Counts one received datagram and returns its dump line when due.
    pub fn on_datagram(&mut self, datagram: &[u8], copied: usize) -> Option<String> {
        if copied == 0 {
            return None;
        }
        self.seen += 1;
        if self.every > 0 && self.seen % self.every == 0 {
            Some(dump_line(datagram, copied))
        } else {
            None
        }
    }
}

/// Windows fails the receive, instead of truncating silently, when a
/// datagram is larger than the buffer. The buffer still holds its head.
fn is_truncated(e: &io::Error) -> bool {
    cfg!(windows) && e.raw_os_error() == Some(WSAEMSGSIZE)
}

/// Non-blocking UDP listener for DDP pixel pushes.
pub struct PacketSource {
    socket: UdpSocket,
    buf: Box<[u8]>,
    last_len: usize,
}

impl PacketSource {
    /// Binds the DDP listener on all IPv4 interfaces at `port`.
    pub fn open(port: u16) -> Result<Self> {
        Self::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())
    }

    /// Binds the listener at `addr` with address reuse and non-blocking mode.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| SimError::socket("create socket", e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| SimError::socket("enable address reuse", e))?;
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|e| SimError::socket("bind", e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| SimError::socket("set non-blocking mode", e))?;

        let socket: UdpSocket = socket.into();
        if let Ok(local) = socket.local_addr() {
            tracing::info!(%local, "DDP listener bound");
        }

        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM].into_boxed_slice(),
            last_len: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| SimError::socket("query local address", e))
    }

    /// Reads at most one pending datagram into `pixels` without blocking.
    ///
    /// Datagrams longer than [`MAX_DATAGRAM`] are cut to that length. An I/O
    /// failure other than "would block" or "interrupted" means the DDP
    /// channel is gone and is returned as [`SimError::Receive`].
    pub fn poll(&mut self, pixels: &mut PixelBuffer) -> Result<PollResult> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, src)) => {
                self.last_len = len;
                let copied = decode_into(&self.buf[..len], pixels);
                tracing::trace!(%src, len, copied, "DDP datagram");
                Ok(PollResult::Received(copied))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(PollResult::NoData),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(PollResult::Interrupted),
            Err(e) if is_truncated(&e) => {
                self.last_len = self.buf.len();
                let copied = decode_into(&self.buf, pixels);
                tracing::trace!(copied, "DDP datagram truncated");
                Ok(PollResult::Received(copied))
            }
            Err(e) => Err(SimError::Receive(e)),
        }
    }

    /// Raw bytes of the most recently received datagram.
    pub fn last_datagram(&self) -> &[u8] {
        &self.buf[..self.last_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::Rgb;
    use std::thread;
    use std::time::Duration;

    fn loopback_pair() -> (PacketSource, UdpSocket, SocketAddr) {
        let source = PacketSource::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let target = source.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        (source, sender, target)
    }

    fn poll_until_received(source: &mut PacketSource, pixels: &mut PixelBuffer) -> PollResult {
        for _ in 0..200 {
            match source.poll(pixels).unwrap() {
                PollResult::NoData | PollResult::Interrupted => {
                    thread::sleep(Duration::from_millis(5))
                }
                received => return received,
            }
        }
        panic!("No datagram arrived on loopback");
    }

    fn datagram(payload: &[u8]) -> Vec<u8> {
        DdpHeader::datagram(1, payload)
    }

    #[test]
    fn test_header_layout() {
        let header = DdpHeader {
            push: true,
            sequence: 0x13,
            offset: 0x0102_0304,
            length: 0x0506,
        };
        assert_eq!(
            header.to_bytes(),
            [0x41, 0x03, 0x0b, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]
        );
    }

    #[test]
    fn test_payload_skips_header() {
        assert_eq!(payload(&datagram(&[1, 2, 3])), &[1, 2, 3]);
        assert!(payload(&[0u8; 10]).is_empty());
        assert!(payload(&[0u8; 4]).is_empty(), "Runt datagrams have no payload");
    }

    #[test]
    fn test_decode_clamps_oversized_payload() {
        let mut pixels = PixelBuffer::new(10);
        let packet = datagram(&[0x7f; 3000]);
        assert_eq!(decode_into(&packet, &mut pixels), 30);
    }

    #[test]
    fn test_dump_line() {
        let packet = datagram(&[0xff, 0x80, 0x00, 0x01, 0x02, 0x03]);
        assert_eq!(
            dump_line(&packet, 6),
            "DDP: 41010b01000000000006 ff8000 ... (len: 16, 2 pixel)"
        );
    }

    #[test]
    fn test_dump_line_short_datagram() {
        assert_eq!(
            dump_line(&[0x41, 0x01], 0),
            "DDP: 4101---------------- ------ ... (len: 2, 0 pixel)"
        );
    }

    #[test]
    fn test_dumper_counts_only_data_packets() {
        let packet = datagram(&[1, 2, 3]);
        let header_only = datagram(&[]);
        let mut dumper = PacketDumper::new(2);

        assert_eq!(dumper.on_datagram(&packet, 3), None);
        assert_eq!(dumper.on_datagram(&header_only, 0), None, "Empty datagrams are skipped");
        assert_eq!(
            dumper.on_datagram(&packet, 3),
            Some(dump_line(&packet, 3)),
            "Second data packet is dumped"
        );
        assert_eq!(dumper.on_datagram(&packet, 3), None);
    }

    #[test]
    fn test_dumper_disabled() {
        let packet = datagram(&[1, 2, 3]);
        let mut dumper = PacketDumper::new(0);
        assert!((0..10).all(|_| dumper.on_datagram(&packet, 3).is_none()));
    }

    #[test]
    fn test_truncation_error_only_on_windows() {
        let err = io::Error::from_raw_os_error(WSAEMSGSIZE);
        assert_eq!(is_truncated(&err), cfg!(windows));
        assert!(!is_truncated(&io::Error::from(ErrorKind::WouldBlock)));
    }

    #[test]
    fn test_poll_datagram_larger_than_read_buffer() {
        let (mut source, sender, target) = loopback_pair();
        let mut pixels = PixelBuffer::new(1000);

        sender.send_to(&datagram(&[0x11; 2000]), target).unwrap();
        assert_eq!(
            poll_until_received(&mut source, &mut pixels),
            PollResult::Received(MAX_DATAGRAM - HEADER_LEN),
            "Only the first read buffer's worth of payload is used"
        );
        assert_eq!(source.last_datagram().len(), MAX_DATAGRAM);
        assert_eq!(pixels.get(0), Some(Rgb::new(0x11, 0x11, 0x11)));
    }

    #[test]
    fn test_poll_without_data() {
        let (mut source, _sender, _target) = loopback_pair();
        let mut pixels = PixelBuffer::new(4);
        assert_eq!(source.poll(&mut pixels).unwrap(), PollResult::NoData);
        assert!(pixels.is_blank());
    }

    #[test]
    fn test_poll_single_pixel_datagram() {
        let (mut source, sender, target) = loopback_pair();
        let mut pixels = PixelBuffer::new(4);
        pixels.set(1, Rgb::new(5, 5, 5));
        pixels.set(3, Rgb::new(6, 6, 6));

        sender.send_to(&datagram(&[10, 20, 30]), target).unwrap();
        assert_eq!(poll_until_received(&mut source, &mut pixels), PollResult::Received(3));

        assert_eq!(pixels.get(0), Some(Rgb::new(10, 20, 30)));
        assert_eq!(pixels.get(1), Some(Rgb::new(5, 5, 5)), "Other pixels untouched");
        assert_eq!(pixels.get(2), Some(Rgb::BLACK));
        assert_eq!(pixels.get(3), Some(Rgb::new(6, 6, 6)));
        assert_eq!(source.last_datagram().len(), 13);
    }

    #[test]
    fn test_poll_oversized_payload_is_clamped() {
        let (mut source, sender, target) = loopback_pair();
        let mut pixels = PixelBuffer::new(10);

        // Largest payload that fits one read.
        sender.send_to(&datagram(&[0xaa; MAX_DATAGRAM - HEADER_LEN]), target).unwrap();
        assert_eq!(poll_until_received(&mut source, &mut pixels), PollResult::Received(30));
        assert_eq!(pixels.capacity(), 10);
    }

    #[test]
    fn test_poll_header_only_datagram() {
        let (mut source, sender, target) = loopback_pair();
        let mut pixels = PixelBuffer::new(2);

        sender.send_to(&[0u8; 6], target).unwrap();
        assert_eq!(poll_until_received(&mut source, &mut pixels), PollResult::Received(0));
        assert!(pixels.is_blank());
    }

    #[test]
    fn test_poll_reads_one_datagram_per_call() {
        let (mut source, sender, target) = loopback_pair();
        let mut pixels = PixelBuffer::new(1);

        sender.send_to(&datagram(&[1, 1, 1]), target).unwrap();
        sender.send_to(&datagram(&[2, 2, 2]), target).unwrap();

        poll_until_received(&mut source, &mut pixels);
        assert_eq!(pixels.get(0), Some(Rgb::new(1, 1, 1)));
        poll_until_received(&mut source, &mut pixels);
        assert_eq!(pixels.get(0), Some(Rgb::new(2, 2, 2)));
    }
}
