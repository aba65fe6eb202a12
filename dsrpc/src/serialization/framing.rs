//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Frame codec for stream transports.
//!
//! Every message on a connection is a length-prefixed frame:
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! - **Length**: u32 in big-endian format, excludes itself
//! - **Payload**: a postcard-encoded [`Message`](crate::protocol::Message)
//!
//! Decoding is incremental: bytes are appended to a buffer as they arrive and
//! [`WireCodec::decode`] yields complete frames, leaving partial ones buffered.
//! A length above the configured maximum is a corrupt stream; the caller is
//! expected to close the connection.
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::serialization::framing::{LengthPrefixedCodec, WireCodec};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = LengthPrefixedCodec::default();
//! let mut wire = Vec::new();
//! codec.encode(b"Hello", &mut wire)?;
//!
//! // Deliver the bytes in two reads.
//! let mut buffer = wire[..3].to_vec();
//! assert_eq!(codec.decode(&mut buffer)?, None);
//! buffer.extend_from_slice(&wire[3..]);
//! assert_eq!(codec.decode(&mut buffer)?, Some(b"Hello".to_vec()));
//! # Ok(())
//! # }
//! ```

use crate::transport::TransportError;

/// Default maximum frame size (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Converts between payloads and the bytes written to a stream.
///
/// Codecs are shared by the reader and writer tasks of a connection, so they
/// hold no per-stream state; the read buffer is owned by the caller.
pub trait WireCodec: Send + Sync + 'static {
    /// Appends the framed form of `payload` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::FrameTooLarge`] if the payload exceeds the
    /// codec's maximum frame size.
    fn encode(&self, payload: &[u8], dst: &mut Vec<u8>) -> Result<(), TransportError>;

    /// Removes and returns the next complete frame from `src`.
    ///
    /// Returns `Ok(None)` if `src` does not yet hold a complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::FrameTooLarge`] if the buffered length header
    /// announces a frame above the maximum. The stream cannot be resynchronized
    /// after this error.
    fn decode(&self, src: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError>;
}

/// The `[u32 length][payload]` codec.
#[derive(Debug, Clone, Copy)]
pub struct LengthPrefixedCodec {
    max_frame_size: u32,
}

impl LengthPrefixedCodec {
    /// Creates a codec that rejects frames larger than `max_frame_size` bytes.
    pub fn new(max_frame_size: u32) -> Self {
        Self { max_frame_size }
    }

    /// Returns the maximum accepted payload size.
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }
}

impl Default for LengthPrefixedCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl WireCodec for LengthPrefixedCodec {
    fn encode(&self, payload: &[u8], dst: &mut Vec<u8>) -> Result<(), TransportError> {
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= self.max_frame_size)
            .ok_or(TransportError::FrameTooLarge {
                size: payload.len() as u64,
                max: self.max_frame_size,
            })?;
        dst.reserve(FRAME_HEADER_SIZE + payload.len());
        dst.extend_from_slice(&len.to_be_bytes());
        dst.extend_from_slice(payload);
        Ok(())
    }

    fn decode(&self, src: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let mut header = [0u8; FRAME_HEADER_SIZE];
        header.copy_from_slice(&src[..FRAME_HEADER_SIZE]);
        let len = u32::from_be_bytes(header);
        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: u64::from(len),
                max: self.max_frame_size,
            });
        }

        let end = FRAME_HEADER_SIZE + len as usize;
        if src.len() < end {
            src.reserve(end - src.len());
            return Ok(None);
        }
        let frame = src[FRAME_HEADER_SIZE..end].to_vec();
        src.drain(..end);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let codec = LengthPrefixedCodec::default();
        let mut wire = Vec::new();
        codec.encode(b"Hello, world!", &mut wire).unwrap();
        assert_eq!(&wire[0..4], &13u32.to_be_bytes());
        assert_eq!(&wire[4..], b"Hello, world!");
    }

    #[test]
    fn test_decode_multiple_frames_in_one_read() {
        let codec = LengthPrefixedCodec::default();
        let mut wire = Vec::new();
        codec.encode(b"one", &mut wire).unwrap();
        codec.encode(b"", &mut wire).unwrap();
        codec.encode(b"three", &mut wire).unwrap();

        assert_eq!(codec.decode(&mut wire).unwrap(), Some(b"one".to_vec()));
        assert_eq!(codec.decode(&mut wire).unwrap(), Some(Vec::new()));
        assert_eq!(codec.decode(&mut wire).unwrap(), Some(b"three".to_vec()));
        assert_eq!(codec.decode(&mut wire).unwrap(), None);
        assert!(wire.is_empty());
    }

    #[test]
    fn test_decode_byte_by_byte() {
        let codec = LengthPrefixedCodec::default();
        let mut wire = Vec::new();
        codec.encode(b"partial", &mut wire).unwrap();

        let mut buffer = Vec::new();
        let mut frames = Vec::new();
        for byte in wire {
            buffer.push(byte);
            if let Some(frame) = codec.decode(&mut buffer).unwrap() {
                frames.push(frame);
            }
        }
        assert_eq!(frames, vec![b"partial".to_vec()]);
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let codec = LengthPrefixedCodec::new(1024);
        let mut buffer = 4096u32.to_be_bytes().to_vec();
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(TransportError::FrameTooLarge { size: 4096, max: 1024 })
        ));

        // A "negative" signed length reads as a huge unsigned one.
        let mut buffer = (-1i32).to_be_bytes().to_vec();
        assert!(codec.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let codec = LengthPrefixedCodec::new(4);
        let mut wire = Vec::new();
        assert!(codec.encode(b"too long", &mut wire).is_err());
        assert!(wire.is_empty());
    }
}
