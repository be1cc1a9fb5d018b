//! Wire protocol for the sensor hub's raw data socket.
//!
//! After connecting, the client writes its 4-byte little-endian session id
//! and the hub acknowledges with a single `\n` byte. From then on the hub
//! streams frames:
//!
//!   [4 bytes LE sample count n][n fixed-size sample records]
//!
//! Record layouts are fixed per sensor type; see [`sample`].

pub mod error;
pub mod frame;
pub mod reader;
pub mod sample;

pub use error::WireError;
pub use frame::parse_frames;
pub use reader::Cursor;
pub use sample::{decode_sample, sample_size};

/// The single byte the hub sends to acknowledge a session handshake.
pub const HANDSHAKE_ACK: u8 = b'\n';

/// Encode a session id for the post-connect handshake write.
pub fn encode_session_id(session_id: i32) -> [u8; 4] {
    session_id.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_little_endian() {
        assert_eq!(encode_session_id(7), [7, 0, 0, 0]);
        assert_eq!(encode_session_id(-1), [0xff, 0xff, 0xff, 0xff]);
    }
}
