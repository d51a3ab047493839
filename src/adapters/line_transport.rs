//! Newline-framed command transport.
//!
//! Reads text lines from any byte stream (the UART console on target, a
//! test cursor on the host) and hands each one to the registered
//! [`CommandHandler`]. Each frame is truncated to [`MAX_MESSAGE_LEN`]
//! bytes, the same bound the interpreter applies, so a runaway line
//! never grows a buffer.

use std::io::{self, BufRead};

use heapless::Vec;
use log::debug;

use crate::app::commands::MAX_MESSAGE_LEN;
use crate::app::ports::CommandHandler;

pub struct LineTransport<R> {
    reader: R,
    line: std::vec::Vec<u8>,
}

impl<R: BufRead> LineTransport<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: std::vec::Vec::with_capacity(64),
        }
    }

    /// Deliver lines until end of stream. Returns the number delivered
    /// (blank lines excluded).
    pub fn pump(&mut self, handler: &impl CommandHandler) -> io::Result<usize> {
        let mut delivered = 0;
        loop {
            match self.next(handler)? {
                Delivery::Message => delivered += 1,
                Delivery::Blank => {}
                Delivery::Closed => return Ok(delivered),
            }
        }
    }

    fn next(&mut self, handler: &impl CommandHandler) -> io::Result<Delivery> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(Delivery::Closed);
        }

        let trimmed = trim_line_ending(&self.line);
        if trimmed.is_empty() {
            return Ok(Delivery::Blank);
        }

        let mut frame: Vec<u8, MAX_MESSAGE_LEN> = Vec::new();
        let take = trimmed.len().min(MAX_MESSAGE_LEN);
        // Cannot fail: `take` never exceeds the capacity.
        let _ = frame.extend_from_slice(&trimmed[..take]);
        if take < trimmed.len() {
            debug!("transport: truncated {} byte line", trimmed.len());
        }
        handler.on_message(&frame);
        Ok(Delivery::Message)
    }
}

enum Delivery {
    Message,
    Blank,
    Closed,
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}
