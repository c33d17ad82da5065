/*!
Byte source abstraction.

The meter link is a blocking byte stream with a read timeout. A transport
read returns as many bytes as arrived before the timeout, possibly none;
a timeout is never an error at this layer.
*/

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};
use tracing::trace;

/// Blocking, timeout-bounded byte source
pub trait Transport {
    /// Fill `buf` with up to `buf.len()` bytes.
    ///
    /// Returns the number of bytes read. Fewer than requested (including 0)
    /// means the timeout expired or the link closed.
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read_bytes(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read_bytes(buf)
    }
}

/// [`Transport`] over any [`std::io::Read`], such as an open serial port.
///
/// Repeats reads until the buffer is full, the reader reports end of stream
/// or a timeout, or `timeout` has elapsed overall.
///
/// The deadline is checked between reads, so a call can overrun `timeout` by
/// at most one blocking read of `R`. Give the reader a read timeout well
/// below `timeout` (a serial port's poll interval) to keep that bound tight.
pub struct IoTransport<R> {
    reader: R,
    timeout: Duration,
}

impl<R: Read> IoTransport<R> {
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self { reader, timeout }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Release the underlying reader, closing the session
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Transport for IoTransport<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let deadline = Instant::now() + self.timeout;
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
                Err(e) => return Err(e),
            }

            if filled < buf.len() && Instant::now() >= deadline {
                break;
            }
        }

        trace!("Read {} of {} bytes", filled, buf.len());
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out bytes in fixed-size chunks, then times out
    struct Chunked {
        data: Vec<u8>,
        chunk: usize,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::new(ErrorKind::TimedOut, "timed out"));
            }
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }

    /// Reader that blocks for `delay` before each byte
    struct Slow {
        delay: Duration,
    }

    impl Read for Slow {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(self.delay);
            buf[0] = 0x10;
            Ok(1)
        }
    }

    /// Reader that always fails
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn test_full_read() {
        let mut transport = IoTransport::new(Cursor::new(vec![1, 2, 3, 4]), Duration::from_secs(1));
        let mut buf = [0u8; 3];
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_short_read_at_end_of_stream() {
        let mut transport = IoTransport::new(Cursor::new(vec![9, 8]), Duration::from_secs(1));
        let mut buf = [0u8; 14];
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_partial_reads_are_accumulated() {
        let reader = Chunked { data: (0..10).collect(), chunk: 3 };
        let mut transport = IoTransport::new(reader, Duration::from_secs(1));
        let mut buf = [0u8; 8];
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 8);
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);

        // Remaining two bytes, then the reader times out
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(transport.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_deadline_overrun_bounded_by_one_read() {
        let delay = Duration::from_millis(30);
        let timeout = Duration::from_millis(100);
        let mut transport = IoTransport::new(Slow { delay }, timeout);
        let mut buf = [0u8; 14];

        let started = Instant::now();
        let got = transport.read_bytes(&mut buf).unwrap();
        let elapsed = started.elapsed();

        assert!(got < buf.len());
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + delay * 3, "took {:?}", elapsed);
    }

    #[test]
    fn test_io_errors_propagate() {
        let mut transport = IoTransport::new(Broken, Duration::from_secs(1));
        let mut buf = [0u8; 1];
        let err = transport.read_bytes(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
