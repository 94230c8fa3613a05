//! The multipart frame codec.
//!
//! Each multipart message is one length-delimited TCP frame whose body is a
//! sequence of length-prefixed frames:
//!
//! ```text
//! u32 body length | (u32 frame length | frame bytes)*
//! ```

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

// Layer 3: Internal module imports
// (none)

const LENGTH_PREFIX: usize = 4;

/// Codec turning a TCP byte stream into multipart messages and back.
#[derive(Debug, Clone)]
pub struct MultipartCodec {
    max_message_length: usize,
}

impl MultipartCodec {
    /// Update payloads can be whole datasets; cap a single multipart
    /// message at 256 MiB to bound a misbehaving peer.
    pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 256 * 1024 * 1024;

    pub fn new() -> Self {
        Self {
            max_message_length: Self::DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    pub fn with_max_message_length(max_message_length: usize) -> Self {
        Self { max_message_length }
    }
}

impl Default for MultipartCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MultipartCodec {
    type Item = Vec<Bytes>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }
        let mut length_bytes = [0u8; LENGTH_PREFIX];
        length_bytes.copy_from_slice(&src[..LENGTH_PREFIX]);
        let body_length = u32::from_be_bytes(length_bytes) as usize;
        if body_length > self.max_message_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("multipart message of {body_length} bytes exceeds the maximum"),
            ));
        }
        if src.len() < LENGTH_PREFIX + body_length {
            src.reserve(LENGTH_PREFIX + body_length - src.len());
            return Ok(None);
        }
        src.advance(LENGTH_PREFIX);
        let mut body = src.split_to(body_length).freeze();

        let mut frames = Vec::new();
        while body.has_remaining() {
            if body.remaining() < LENGTH_PREFIX {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "truncated frame length inside multipart message",
                ));
            }
            let frame_length = body.get_u32() as usize;
            if body.remaining() < frame_length {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "truncated frame inside multipart message",
                ));
            }
            frames.push(body.split_to(frame_length));
        }
        Ok(Some(frames))
    }
}

impl Encoder<Vec<Bytes>> for MultipartCodec {
    type Error = io::Error;

    fn encode(&mut self, frames: Vec<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body_length: usize = frames
            .iter()
            .map(|frame| LENGTH_PREFIX + frame.len())
            .sum();
        if body_length > self.max_message_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("multipart message of {body_length} bytes exceeds the maximum"),
            ));
        }
        dst.reserve(LENGTH_PREFIX + body_length);
        dst.put_u32(body_length as u32);
        for frame in frames {
            dst.put_u32(frame.len() as u32);
            dst.put_slice(&frame);
        }
        Ok(())
    }
}
