//! Schema-tagged envelope framing.
//!
//! Format: `[marker(1) = 0x00][schema_id(4, big-endian)][payload(N)]`

use crate::error::{CodecError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// The only defined envelope marker
pub const MAGIC_BYTE: u8 = 0x00;

/// Marker plus schema ID
pub const HEADER_LEN: usize = 5;

/// A parsed envelope borrowing its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub schema_id: u32,
    pub payload: &'a [u8],
}

/// Prepend the marker and schema ID to an encoded payload.
pub fn frame(schema_id: u32, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf.put_slice(payload);
    buf.freeze()
}

/// Split an envelope into schema ID and payload.
///
/// The marker is checked first, so a foreign single byte reports
/// `UnsupportedEnvelope` rather than `Corrupt`.
pub fn parse(data: &[u8]) -> Result<Envelope<'_>> {
    let marker = *data
        .first()
        .ok_or_else(|| CodecError::Corrupt("empty record".to_string()))?;

    if marker != MAGIC_BYTE {
        return Err(CodecError::UnsupportedEnvelope(marker));
    }

    if data.len() < HEADER_LEN {
        return Err(CodecError::Corrupt(format!(
            "envelope header needs {} bytes, got {}",
            HEADER_LEN,
            data.len()
        )));
    }

    let mut id_bytes = &data[1..HEADER_LEN];
    Ok(Envelope {
        schema_id: id_bytes.get_u32(),
        payload: &data[HEADER_LEN..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let framed = frame(0x0102_0304, b"avro");
        assert_eq!(&framed[..], &[0x00, 0x01, 0x02, 0x03, 0x04, b'a', b'v', b'r', b'o']);

        let envelope = parse(&framed).unwrap();
        assert_eq!(envelope.schema_id, 0x0102_0304);
        assert_eq!(envelope.payload, b"avro");
    }

    #[test]
    fn test_empty_payload_is_structurally_valid() {
        let framed = frame(7, &[]);
        let envelope = parse(&framed).unwrap();
        assert_eq!(envelope.schema_id, 7);
        assert!(envelope.payload.is_empty());
    }

    #[test]
    fn test_short_inputs_are_corrupt() {
        for len in 0..HEADER_LEN {
            let data = vec![0u8; len];
            assert!(
                matches!(parse(&data), Err(CodecError::Corrupt(_))),
                "len {} should be corrupt",
                len
            );
        }
    }

    #[test]
    fn test_unknown_marker() {
        assert!(matches!(
            parse(&[0x01, 0, 0, 0, 1, 2]),
            Err(CodecError::UnsupportedEnvelope(0x01))
        ));
        assert!(matches!(parse(&[0xFF]), Err(CodecError::UnsupportedEnvelope(0xFF))));
    }
}
