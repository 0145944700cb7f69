//! Serialized size measurement.
//!
//! Sizes are compact JSON byte counts. They are computed by streaming the
//! value into a counting writer, so no intermediate buffer is allocated.

use serde::Serialize;
use std::io;

#[derive(Debug, Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Compact JSON size of `value` in bytes, or `None` if it cannot be serialized.
pub fn serialized_size<T: Serialize + ?Sized>(value: &T) -> Option<usize> {
    let mut counter = ByteCounter::default();
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => Some(counter.0),
        Err(err) => {
            log::warn!("[measure] value could not be serialized: {}", err);
            None
        }
    }
}
