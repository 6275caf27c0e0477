//! Length-prefixed binary persistence of counter arrays

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Default chunk capacity in elements: 1 MiB of serialized data.
pub const DEFAULT_CAPACITY: usize = 256 * 1024;

/// Reads and writes a `u32` array as a 4-byte big-endian element count
/// followed by that many 4-byte values, streamed through a fixed-capacity
/// chunk so arrays far larger than the chunk never have to be serialized
/// in one piece.
///
/// I/O errors abort the operation and propagate; a partially written file
/// is left behind for the caller to deal with.
pub struct ArrayStore {
    path: PathBuf,
    capacity: usize,
}

impl ArrayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    /// `capacity` is the chunk size in elements, not bytes.
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the array, returning the number of bytes written:
    /// `(data.len() + 1) * 4`.
    pub fn write(&self, data: &[u32]) -> Result<u64> {
        ensure!(
            data.len() <= u32::MAX as usize,
            "array of {} elements exceeds the format's 32-bit length prefix",
            data.len()
        );
        let mut file = File::create(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        let chunk_bytes = self.capacity * 4;
        let mut buffer = BytesMut::with_capacity(chunk_bytes);
        let mut written = 0u64;
        buffer.put_u32(data.len() as u32);
        for &value in data {
            if buffer.len() >= chunk_bytes {
                file.write_all(&buffer)?;
                written += buffer.len() as u64;
                buffer.clear();
            }
            buffer.put_u32(value);
        }
        file.write_all(&buffer)?;
        written += buffer.len() as u64;
        Ok(written)
    }

    /// Reads the array back, refilling the chunk from the file as it
    /// drains. The result has exactly the length stored in the prefix.
    pub fn read(&self) -> Result<Vec<u32>> {
        let mut file =
            File::open(&self.path).with_context(|| format!("opening {}", self.path.display()))?;
        let mut chunk = vec![0u8; self.capacity * 4];
        let mut filled = fill_chunk(&mut file, &mut chunk)?;
        ensure!(
            filled >= 4,
            "{} is too short to hold a length prefix",
            self.path.display()
        );
        let len = (&chunk[..4]).get_u32() as usize;
        let mut pos = 4;
        let mut data = Vec::with_capacity(len);
        while data.len() < len {
            if filled - pos < 4 {
                filled = fill_chunk(&mut file, &mut chunk)?;
                pos = 0;
                if filled < 4 {
                    break;
                }
            }
            data.push((&chunk[pos..pos + 4]).get_u32());
            pos += 4;
        }
        // A truncated file yields zeros for the missing tail.
        data.resize(len, 0);
        Ok(data)
    }
}

/// Reads until the chunk is full or the file ends; short reads at chunk
/// boundaries must not split a 4-byte element.
fn fill_chunk(file: &mut File, chunk: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        let n = file.read(&mut chunk[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
