//! Raw physical-memory images.

use paging_addresses::PhysicalAddress;
use paging_walk::PhysicalMemory;
use std::path::Path;
use std::{fs, io};

/// An entry read the image cannot satisfy.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ImageReadError {
    #[error("{address} is beyond the end of the image ({len:#x} bytes)")]
    OutOfBounds { address: PhysicalAddress, len: usize },
    #[error("{0} is not 8-byte aligned")]
    Unaligned(PhysicalAddress),
}

/// A flat memory image: byte offset `n` holds physical address `n`.
pub struct ImageMemory {
    bytes: Vec<u8>,
}

impl ImageMemory {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        fs::read(path).map(Self::from_bytes)
    }

    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl PhysicalMemory for ImageMemory {
    type Error = ImageReadError;

    fn read_u64(&self, address: PhysicalAddress) -> Result<u64, ImageReadError> {
        if !address.is_aligned_to(8) {
            return Err(ImageReadError::Unaligned(address));
        }

        let out_of_bounds = ImageReadError::OutOfBounds {
            address,
            len: self.bytes.len(),
        };
        let start = usize::try_from(address.as_u64()).map_err(|_| out_of_bounds)?;
        let word = start
            .checked_add(8)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(out_of_bounds)?;

        let mut raw = [0u8; 8];
        raw.copy_from_slice(word);
        Ok(u64::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(words: &[(usize, u64)], len: usize) -> ImageMemory {
        let mut bytes = vec![0; len];
        for &(offset, value) in words {
            bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        }
        ImageMemory::from_bytes(bytes)
    }

    #[test]
    fn reads_little_endian_words() {
        let memory = image(&[(0x10, 0x0102_0304_0506_0708)], 0x20);
        assert_eq!(
            memory.read_u64(PhysicalAddress::new(0x10)).unwrap(),
            0x0102_0304_0506_0708
        );
        assert_eq!(memory.read_u64(PhysicalAddress::new(0x18)).unwrap(), 0);
    }

    #[test]
    fn rejects_reads_past_the_end() {
        let memory = image(&[], 0x20);
        assert_eq!(
            memory.read_u64(PhysicalAddress::new(0x20)),
            Err(ImageReadError::OutOfBounds {
                address: PhysicalAddress::new(0x20),
                len: 0x20
            })
        );
        assert!(memory.read_u64(PhysicalAddress::new(u64::MAX & !7)).is_err());
    }

    #[test]
    fn rejects_unaligned_reads() {
        let memory = image(&[], 0x20);
        assert_eq!(
            memory.read_u64(PhysicalAddress::new(0x4)),
            Err(ImageReadError::Unaligned(PhysicalAddress::new(0x4)))
        );
    }
}
