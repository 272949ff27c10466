//! Inbound line framing
//!
//! Splits the client byte stream on `\n`. Invalid UTF-8 is decoded lossily
//! and overlong lines are discarded up to the next newline, so neither one
//! ends the connection.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Default cap on one inbound line, newline excluded
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// One framed unit of client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A complete line, without its `\n`
    Text(String),
    /// A line longer than the cap; its bytes were dropped
    TooLong,
}

/// Newline decoder with a length cap and lossy UTF-8
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Where the next newline search starts
    next_index: usize,
    /// Dropping the tail of an overlong line
    discarding: bool,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Decoder for LineCodec {
    type Item = InboundLine;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<InboundLine>, io::Error> {
        let newline = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| offset + self.next_index);

        match newline {
            Some(index) if self.discarding || index > self.max_length => {
                buf.advance(index + 1);
                self.next_index = 0;
                self.discarding = false;
                Ok(Some(InboundLine::TooLong))
            }
            Some(index) => {
                let line = buf.split_to(index + 1);
                self.next_index = 0;
                Ok(Some(InboundLine::Text(
                    String::from_utf8_lossy(&line[..index]).into_owned(),
                )))
            }
            None if self.discarding || buf.len() > self.max_length => {
                buf.clear();
                self.next_index = 0;
                self.discarding = true;
                Ok(None)
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<InboundLine>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            return Ok(Some(InboundLine::TooLong));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Unterminated last line
        let line = buf.split_to(buf.len());
        Ok(Some(InboundLine::Text(
            String::from_utf8_lossy(&line).into_owned(),
        )))
    }
}
