use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Total wire size of a frame: the nRF24L01 maximum payload.
pub const FRAME_SIZE: usize = 32;

/// Control field size at the start of every frame.
pub const HEADER_SIZE: usize = 3;

/// Payload capacity after the control field.
pub const PAYLOAD_SIZE: usize = FRAME_SIZE - HEADER_SIZE;

/// Location of one bit-packed header field.
///
/// Fields are packed least significant bit first within a single header
/// byte; no field straddles a byte boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Header byte index (0..3).
    pub byte: usize,
    /// Bit offset of the field's least significant bit within that byte.
    pub offset: u32,
    /// Field width in bits.
    pub width: u32,
}

impl BitField {
    /// Largest value the field can hold.
    pub const fn max(self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// Extract the field from a header.
    pub const fn read(self, header: &[u8; HEADER_SIZE]) -> u8 {
        (header[self.byte] >> self.offset) & self.max()
    }

    /// Store `value` into the field, leaving the other bits of the byte intact.
    /// Bits of `value` above the field width are discarded.
    pub fn write(self, header: &mut [u8; HEADER_SIZE], value: u8) {
        let mask = self.max() << self.offset;
        header[self.byte] = (header[self.byte] & !mask) | ((value << self.offset) & mask);
    }
}

/// Header field layout.
///
/// ```text
///  byte 0:  [7 6 5 4 3 | 2 1 0]   data_length (5) | version (3)
///  byte 1:  [7 6 5 | 4 3 2 1 0]   endpoint (3)    | frame_number (5)
///  byte 2:  [7 6 5 4 3 2 | 1 | 0] reserved (6)    | require_ack | multicast
/// ```
pub mod fields {
    use super::BitField;

    /// Protocol version tag: byte 0, bits 0-2.
    pub const VERSION: BitField = BitField {
        byte: 0,
        offset: 0,
        width: 3,
    };
    /// Number of meaningful payload bytes: byte 0, bits 3-7.
    pub const DATA_LENGTH: BitField = BitField {
        byte: 0,
        offset: 3,
        width: 5,
    };
    /// Sequence tag within a multi-frame transfer: byte 1, bits 0-4.
    pub const FRAME_NUMBER: BitField = BitField {
        byte: 1,
        offset: 0,
        width: 5,
    };
    /// Logical service the payload targets: byte 1, bits 5-7.
    pub const ENDPOINT: BitField = BitField {
        byte: 1,
        offset: 5,
        width: 3,
    };
    /// Group-addressed frame: byte 2, bit 0.
    pub const MULTICAST: BitField = BitField {
        byte: 2,
        offset: 0,
        width: 1,
    };
    /// Sender wants an ack frame back: byte 2, bit 1.
    pub const REQUIRE_ACK: BitField = BitField {
        byte: 2,
        offset: 1,
        width: 1,
    };
}

/// Decoded form of one 32-byte wire frame.
///
/// Field setters reject values wider than their bit field, so a
/// `PackedFrame` always encodes without loss. Equality compares the header
/// and the first `data_length` payload bytes; the payload tail is not part
/// of a frame's identity.
#[derive(Debug, Clone)]
pub struct PackedFrame {
    version: u8,
    data_length: u8,
    frame_number: u8,
    endpoint: u8,
    multicast: bool,
    require_ack: bool,
    payload: [u8; PAYLOAD_SIZE],
}

impl PackedFrame {
    /// An all-zero frame with an empty payload.
    pub const fn new() -> Self {
        Self {
            version: 0,
            data_length: 0,
            frame_number: 0,
            endpoint: 0,
            multicast: false,
            require_ack: false,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }

    /// A frame carrying a fixed-size `data` prefix.
    ///
    /// Evaluated in a const context, an oversized array fails to compile.
    pub(crate) const fn from_array<const N: usize>(data: [u8; N]) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        let mut i = 0;
        while i < N {
            payload[i] = data[i];
            i += 1;
        }
        Self {
            data_length: N as u8,
            payload,
            ..Self::new()
        }
    }

    /// A frame carrying `data` as its payload.
    pub fn with_data(data: &[u8]) -> Result<Self> {
        let mut frame = Self::new();
        frame.write_data(data)?;
        Ok(frame)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn data_length(&self) -> u8 {
        self.data_length
    }

    pub fn frame_number(&self) -> u8 {
        self.frame_number
    }

    pub fn endpoint(&self) -> u8 {
        self.endpoint
    }

    pub fn multicast(&self) -> bool {
        self.multicast
    }

    pub fn require_ack(&self) -> bool {
        self.require_ack
    }

    pub fn set_version(&mut self, version: u8) -> Result<()> {
        self.version = checked("version", fields::VERSION, version)?;
        Ok(())
    }

    pub fn set_frame_number(&mut self, frame_number: u8) -> Result<()> {
        self.frame_number = checked("frame_number", fields::FRAME_NUMBER, frame_number)?;
        Ok(())
    }

    pub fn set_endpoint(&mut self, endpoint: u8) -> Result<()> {
        self.endpoint = checked("endpoint", fields::ENDPOINT, endpoint)?;
        Ok(())
    }

    pub fn set_multicast(&mut self, multicast: bool) {
        self.multicast = multicast;
    }

    pub fn set_require_ack(&mut self, require_ack: bool) {
        self.require_ack = require_ack;
    }

    /// Replace the payload with `data` and set `data_length` to match.
    ///
    /// The payload tail past `data.len()` is cleared.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > PAYLOAD_SIZE {
            return Err(FrameError::FieldOutOfRange {
                field: "data_length",
                value: data.len(),
                max: PAYLOAD_SIZE,
            });
        }
        self.payload = [0u8; PAYLOAD_SIZE];
        self.payload[..data.len()].copy_from_slice(data);
        self.data_length = data.len() as u8;
        Ok(())
    }

    /// The meaningful payload bytes.
    pub fn read_data(&self) -> &[u8] {
        &self.payload[..usize::from(self.data_length)]
    }

    /// The full payload area, including bytes past `data_length`.
    pub fn raw_payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }

    /// Mutable access to the full payload area. Does not touch `data_length`.
    pub fn raw_payload_mut(&mut self) -> &mut [u8; PAYLOAD_SIZE] {
        &mut self.payload
    }

    /// Encode into a fresh 32-byte array.
    pub fn pack(&self) -> [u8; FRAME_SIZE] {
        pack(self)
    }

    /// Append the 32-byte encoding to `dst`.
    pub fn pack_into(&self, dst: &mut BytesMut) {
        dst.reserve(FRAME_SIZE);
        dst.put_slice(&pack(self));
    }

    /// Decode a 32-byte buffer.
    pub fn unpack(buf: &[u8]) -> Result<Self> {
        unpack(buf)
    }
}

impl Default for PackedFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PackedFrame {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.data_length == other.data_length
            && self.frame_number == other.frame_number
            && self.endpoint == other.endpoint
            && self.multicast == other.multicast
            && self.require_ack == other.require_ack
            && self.read_data() == other.read_data()
    }
}

impl Eq for PackedFrame {}

fn checked(name: &'static str, field: BitField, value: u8) -> Result<u8> {
    if value > field.max() {
        return Err(FrameError::FieldOutOfRange {
            field: name,
            value: usize::from(value),
            max: usize::from(field.max()),
        });
    }
    Ok(value)
}

/// Encode a frame.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬────────┬──────────────────────────────┐
/// │ byte 0 │ byte 1 │ byte 2 │ payload (29B)                │
/// │ ver|len│ num|ep │ mc|ack │ data_length bytes, then zero │
/// └────────┴────────┴────────┴──────────────────────────────┘
/// ```
///
/// Everything not explicitly written (reserved bits, payload tail) is zero,
/// so re-encoding a decoded frame yields the same bytes every time.
pub fn pack(frame: &PackedFrame) -> [u8; FRAME_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    fields::VERSION.write(&mut header, frame.version);
    fields::DATA_LENGTH.write(&mut header, frame.data_length);
    fields::FRAME_NUMBER.write(&mut header, frame.frame_number);
    fields::ENDPOINT.write(&mut header, frame.endpoint);
    fields::MULTICAST.write(&mut header, u8::from(frame.multicast));
    fields::REQUIRE_ACK.write(&mut header, u8::from(frame.require_ack));

    let mut buf = [0u8; FRAME_SIZE];
    buf[..HEADER_SIZE].copy_from_slice(&header);
    let data = frame.read_data();
    buf[HEADER_SIZE..HEADER_SIZE + data.len()].copy_from_slice(data);
    buf
}

/// Decode a frame.
///
/// Fails with [`FrameError::InvalidLength`] unless `buf` is exactly
/// [`FRAME_SIZE`] bytes, and with [`FrameError::InvalidHeader`] if the
/// header claims more than [`PAYLOAD_SIZE`] data bytes. The whole payload
/// area is kept, including bytes past `data_length`.
pub fn unpack(buf: &[u8]) -> Result<PackedFrame> {
    if buf.len() != FRAME_SIZE {
        return Err(FrameError::InvalidLength {
            len: buf.len(),
            expected: FRAME_SIZE,
        });
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&buf[..HEADER_SIZE]);

    let data_length = fields::DATA_LENGTH.read(&header);
    if usize::from(data_length) > PAYLOAD_SIZE {
        return Err(FrameError::InvalidHeader {
            field: "data_length",
            value: data_length,
            max: PAYLOAD_SIZE as u8,
        });
    }

    let mut payload = [0u8; PAYLOAD_SIZE];
    payload.copy_from_slice(&buf[HEADER_SIZE..]);

    Ok(PackedFrame {
        version: fields::VERSION.read(&header),
        data_length,
        frame_number: fields::FRAME_NUMBER.read(&header),
        endpoint: fields::ENDPOINT.read(&header),
        multicast: fields::MULTICAST.read(&header) != 0,
        require_ack: fields::REQUIRE_ACK.read(&header) != 0,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackedFrame {
        let mut frame = PackedFrame::with_data(&[1, 2, 3, 4]).unwrap();
        frame.set_version(5).unwrap();
        frame.set_frame_number(17).unwrap();
        frame.set_endpoint(6).unwrap();
        frame.set_multicast(true);
        frame.set_require_ack(true);
        frame
    }

    #[test]
    fn header_layout_is_byte_exact() {
        let buf = sample().pack();
        assert_eq!(buf.len(), FRAME_SIZE);
        // version 5 | data_length 4 << 3
        assert_eq!(buf[0], 0x25);
        // frame_number 17 | endpoint 6 << 5
        assert_eq!(buf[1], 0xD1);
        // multicast | require_ack << 1
        assert_eq!(buf[2], 0x03);
        assert_eq!(&buf[3..7], &[1, 2, 3, 4]);
        assert!(buf[7..].iter().all(|b| *b == 0));
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let frame = sample();
        let decoded = unpack(&frame.pack()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.version(), 5);
        assert_eq!(decoded.data_length(), 4);
        assert_eq!(decoded.frame_number(), 17);
        assert_eq!(decoded.endpoint(), 6);
        assert!(decoded.multicast());
        assert!(decoded.require_ack());
        assert_eq!(decoded.read_data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn roundtrip_at_field_limits() {
        let mut frame = PackedFrame::with_data(&[0xFF; PAYLOAD_SIZE]).unwrap();
        frame.set_version(fields::VERSION.max()).unwrap();
        frame.set_frame_number(fields::FRAME_NUMBER.max()).unwrap();
        frame.set_endpoint(fields::ENDPOINT.max()).unwrap();
        assert_eq!(unpack(&frame.pack()).unwrap(), frame);

        let empty = PackedFrame::new();
        assert_eq!(empty.pack(), [0u8; FRAME_SIZE]);
        assert_eq!(unpack(&empty.pack()).unwrap(), empty);
    }

    #[test]
    fn roundtrip_over_every_header_combination() {
        let mut cases = 0usize;
        for version in 0..=fields::VERSION.max() {
            for data_length in 0..=PAYLOAD_SIZE as u8 {
                let data: Vec<u8> = (0..data_length)
                    .map(|i| i.wrapping_mul(37) ^ version ^ 0xA5)
                    .collect();
                for frame_number in 0..=fields::FRAME_NUMBER.max() {
                    for endpoint in 0..=fields::ENDPOINT.max() {
                        for flags in 0..4u8 {
                            let multicast = flags & 0b01 != 0;
                            let require_ack = flags & 0b10 != 0;

                            let mut frame = PackedFrame::with_data(&data).unwrap();
                            frame.set_version(version).unwrap();
                            frame.set_frame_number(frame_number).unwrap();
                            frame.set_endpoint(endpoint).unwrap();
                            frame.set_multicast(multicast);
                            frame.set_require_ack(require_ack);

                            let buf = frame.pack();
                            assert_eq!(buf[0], version | (data_length << 3));
                            assert_eq!(buf[1], frame_number | (endpoint << 5));
                            assert_eq!(buf[2], flags);
                            let end = HEADER_SIZE + usize::from(data_length);
                            assert_eq!(&buf[HEADER_SIZE..end], data.as_slice());
                            assert!(buf[end..].iter().all(|b| *b == 0));

                            let decoded = unpack(&buf).unwrap();
                            assert_eq!(decoded, frame);
                            assert_eq!(decoded.pack(), buf);
                            cases += 1;
                        }
                    }
                }
            }
        }
        assert_eq!(cases, 8 * 30 * 32 * 8 * 4);
    }

    #[test]
    fn from_array_sets_length_and_zero_tail() {
        let frame = PackedFrame::from_array([7u8, 8, 9]);
        assert_eq!(frame.data_length(), 3);
        assert_eq!(frame.read_data(), &[7, 8, 9]);
        assert!(frame.raw_payload()[3..].iter().all(|b| *b == 0));
        assert_eq!(frame, PackedFrame::with_data(&[7, 8, 9]).unwrap());
    }

    #[test]
    fn unpack_rejects_wrong_lengths() {
        for len in [0, 1, FRAME_SIZE - 1, FRAME_SIZE + 1, 64] {
            let buf = vec![0u8; len];
            let err = unpack(&buf).unwrap_err();
            assert_eq!(
                err,
                FrameError::InvalidLength {
                    len,
                    expected: FRAME_SIZE
                }
            );
            assert!(err.is_format_error());
        }
    }

    #[test]
    fn unpack_rejects_oversized_data_length() {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0] = 30 << 3;
        let err = unpack(&buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidHeader {
                field: "data_length",
                value: 30,
                ..
            }
        ));
    }

    #[test]
    fn setters_reject_values_wider_than_field() {
        let mut frame = PackedFrame::new();
        assert!(frame.set_version(8).is_err());
        assert!(frame.set_frame_number(32).is_err());
        assert!(frame.set_endpoint(8).is_err());
        let err = frame.write_data(&[0u8; PAYLOAD_SIZE + 1]).unwrap_err();
        assert!(!err.is_format_error());
        assert_eq!(frame, PackedFrame::new());
    }

    #[test]
    fn pack_zero_fills_payload_tail() {
        let mut buf = [0xEEu8; FRAME_SIZE];
        buf[0] = 2 << 3;
        buf[2] = 0b1111_1100;
        let decoded = unpack(&buf).unwrap();
        assert_eq!(decoded.raw_payload()[5], 0xEE);

        let repacked = decoded.pack();
        assert_eq!(repacked[2], 0, "reserved bits are written as zero");
        assert_eq!(&repacked[3..5], &[0xEE, 0xEE]);
        assert!(repacked[5..].iter().all(|b| *b == 0));
        assert_eq!(unpack(&repacked).unwrap().pack(), repacked);
    }

    #[test]
    fn write_data_clears_previous_tail() {
        let mut frame = PackedFrame::with_data(&[9; 10]).unwrap();
        frame.write_data(&[1, 2]).unwrap();
        assert_eq!(frame.data_length(), 2);
        assert!(frame.raw_payload()[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn pack_into_appends() {
        let mut dst = BytesMut::new();
        sample().pack_into(&mut dst);
        PackedFrame::new().pack_into(&mut dst);
        assert_eq!(dst.len(), 2 * FRAME_SIZE);
        assert_eq!(unpack(&dst[..FRAME_SIZE]).unwrap(), sample());
    }

    #[test]
    fn bit_field_write_preserves_neighbours() {
        let mut header = [0xFFu8; HEADER_SIZE];
        fields::ENDPOINT.write(&mut header, 0);
        assert_eq!(header[1], 0x1F);
        assert_eq!(fields::FRAME_NUMBER.read(&header), 0x1F);
        fields::VERSION.write(&mut header, 0xFF);
        assert_eq!(header[0], 0xFF, "excess value bits are discarded");
    }
}
