//! I/O utilities.
use std::io;
use std::io::prelude::*;

/// An in-memory client connection. Reads hand out the input at most
/// `chunk_size` bytes at a time, like a request arriving over several
/// packets; writes are collected.
pub struct ChunkedStream {
    input: Vec<u8>,
    position: usize,
    chunk_size: usize,
    output: Vec<u8>,
}

impl ChunkedStream {
    pub fn new(input: &[u8], chunk_size: usize) -> Self {
        Self {
            input: input.to_vec(),
            position: 0,
            chunk_size: chunk_size.max(1),
            output: vec![],
        }
    }
    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }
}

impl Read for ChunkedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.input[self.position..];
        let n = remaining.len().min(self.chunk_size).min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for ChunkedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
