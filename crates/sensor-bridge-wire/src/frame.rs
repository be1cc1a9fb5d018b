//! Frame parsing for the data-socket sample stream.

use tracing::trace;

use crate::error::WireError;
use crate::reader::Cursor;

/// Parse one read's worth of bytes into per-frame coalesced sample records.
///
/// The buffer holds zero or more frames, each a 4-byte LE sample count
/// followed by that many `sample_size`-byte records. Queued samples within a
/// frame are stale by the time we read them, so only the last record of each
/// frame is returned for dispatch.
///
/// A frame whose declared payload exceeds the bytes actually present is a
/// hard protocol error; the caller tears the connection down.
pub fn parse_frames(sample_size: usize, buf: &[u8]) -> Result<Vec<&[u8]>, WireError> {
    let mut cursor = Cursor::new(buf);
    let mut coalesced = Vec::new();

    while !cursor.is_empty() {
        let count = cursor.read_u32()? as usize;
        // A count whose payload size overflows usize cannot fit either.
        let declared = count.checked_mul(sample_size).unwrap_or(usize::MAX);
        if cursor.remaining() < declared {
            return Err(WireError::TruncatedFrame {
                declared,
                available: cursor.remaining(),
            });
        }
        if count == 0 {
            continue;
        }
        // Skip everything but the newest record in the batch.
        cursor.take(declared - sample_size)?;
        coalesced.push(cursor.take(sample_size)?);
        if count > 1 {
            trace!(count, "coalesced frame to last sample");
        }
    }

    Ok(coalesced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(records: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::try_from(records.len()).unwrap().to_le_bytes());
        for r in records {
            buf.extend_from_slice(r);
        }
        buf
    }

    #[test]
    fn single_sample_frame() {
        let buf = frame(&[&[1, 2, 3, 4]]);
        let got = parse_frames(4, &buf).unwrap();
        assert_eq!(got, vec![&[1, 2, 3, 4][..]]);
    }

    #[test]
    fn batch_coalesces_to_last() {
        let buf = frame(&[&[1, 1], &[2, 2], &[3, 3]]);
        let got = parse_frames(2, &buf).unwrap();
        assert_eq!(got.len(), 1, "one dispatch per frame");
        assert_eq!(got[0], &[3, 3]);
    }

    #[test]
    fn multiple_frames_in_one_read() {
        let mut buf = frame(&[&[1, 1], &[2, 2]]);
        buf.extend_from_slice(&frame(&[&[9, 9]]));
        let got = parse_frames(2, &buf).unwrap();
        assert_eq!(got, vec![&[2, 2][..], &[9, 9][..]]);
    }

    #[test]
    fn empty_frame_dispatches_nothing() {
        let buf = frame(&[]);
        assert!(parse_frames(4, &buf).unwrap().is_empty());
    }

    #[test]
    fn truncated_frame_rejected_without_dispatch() {
        // Declares 3 records of 4 bytes but supplies only 5 payload bytes.
        let mut buf = Vec::new();
        buf.extend_from_slice(&3_u32.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(
            parse_frames(4, &buf),
            Err(WireError::TruncatedFrame {
                declared: 12,
                available: 5
            })
        );
    }

    #[test]
    fn oversized_count_rejected() {
        // A count near u32::MAX must fail cleanly, not wrap the size math.
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&[0; 16]);
        assert!(matches!(
            parse_frames(13, &buf),
            Err(WireError::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn empty_buffer_is_no_frames() {
        assert!(parse_frames(4, &[]).unwrap().is_empty());
    }
}
