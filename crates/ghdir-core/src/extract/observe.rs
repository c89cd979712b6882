//! Byte-count observation of the archive stream.

use std::io::Read;

/// Observer of the raw download byte stream.
///
/// Purely observational: implementations report progress, they never affect
/// what the extraction pipeline reads, and the pipeline is correct with
/// [`NoopObserver`].
pub trait ProgressObserver {
    /// Called after each successful read with the number of bytes consumed.
    fn on_bytes(&mut self, count: u64);
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for &mut O {
    fn on_bytes(&mut self, count: u64) {
        (**self).on_bytes(count);
    }
}

/// Observer that discards all notifications.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_bytes(&mut self, _count: u64) {}
}

/// `Read` adapter reporting every chunk to an observer as it passes through.
///
/// One producer, one consumer: bytes are handed to the inner reader's caller
/// exactly as read, never reordered or dropped.
pub struct ObservedReader<R, O> {
    inner: R,
    observer: O,
}

impl<R: Read, O: ProgressObserver> ObservedReader<R, O> {
    pub fn new(inner: R, observer: O) -> Self {
        Self { inner, observer }
    }
}

impl<R: Read, O: ProgressObserver> Read for ObservedReader<R, O> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.observer.on_bytes(count as u64);
        Ok(count)
    }
}
