//! # Walking Through a Memory Reader
//!
//! [`PageWalker`] drives a [`Walk`] to completion, fetching each pending entry
//! through a caller-supplied [`PhysicalMemory`] reader. A failed read is
//! reported as [`WalkError::Read`] and is never mistaken for a non-present
//! entry.

use crate::walk::{NotPresent, Step, Translation, Walk};
use crate::{Cr3, LevelKind};
use log::{debug, trace};
use paging_addresses::{PhysicalAddress, VirtualAddress};

/// Read access to the physical memory that holds the paging structures.
///
/// Only 8-byte entry reads are required. Entry addresses handed to the reader
/// are always 8-byte aligned.
pub trait PhysicalMemory {
    /// Reader-specific failure (unbacked address, transport error, ...).
    type Error: core::error::Error + 'static;

    /// Read the little-endian `u64` stored at `address`.
    ///
    /// # Errors
    /// Any reader-specific failure; it ends the walk with [`WalkError::Read`].
    fn read_u64(&self, address: PhysicalAddress) -> Result<u64, Self::Error>;
}

impl<T: PhysicalMemory + ?Sized> PhysicalMemory for &T {
    type Error = T::Error;

    #[inline]
    fn read_u64(&self, address: PhysicalAddress) -> Result<u64, Self::Error> {
        (**self).read_u64(address)
    }
}

/// Why a [`PageWalker`] walk did not produce a [`Translation`].
#[derive(Debug, thiserror::Error)]
pub enum WalkError<E> {
    /// A paging-structure entry had its present bit clear.
    #[error(transparent)]
    NotPresent(#[from] NotPresent),

    /// The reader could not supply the entry.
    #[error("failed to read {level} entry at {address}")]
    Read {
        level: LevelKind,
        address: PhysicalAddress,
        #[source]
        source: E,
    },
}

impl<E> WalkError<E> {
    #[inline]
    #[must_use]
    pub const fn is_not_present(&self) -> bool {
        matches!(self, Self::NotPresent(_))
    }

    /// The level whose entry ended the walk.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> LevelKind {
        match self {
            Self::NotPresent(e) => e.level,
            Self::Read { level, .. } => *level,
        }
    }
}

/// Translates virtual addresses of one address space.
pub struct PageWalker<'m, M: PhysicalMemory + ?Sized> {
    memory: &'m M,
    root: Cr3,
}

impl<'m, M: PhysicalMemory + ?Sized> PageWalker<'m, M> {
    #[inline]
    #[must_use]
    pub const fn new(memory: &'m M, root: Cr3) -> Self {
        Self { memory, root }
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> Cr3 {
        self.root
    }

    /// Walk the hierarchy for `va` and return the full [`Translation`].
    ///
    /// Performs at most four reads and stops at the first non-present entry
    /// or failed read.
    ///
    /// # Errors
    /// - [`WalkError::NotPresent`] if an entry on the path is not present.
    /// - [`WalkError::Read`] if the reader fails.
    pub fn walk(&self, va: VirtualAddress) -> Result<Translation, WalkError<M::Error>> {
        let mut walk = Walk::new(self.root, va);
        loop {
            let (level, address) = walk.pending();
            let raw = self
                .memory
                .read_u64(address)
                .map_err(|source| {
                    debug!("{va}: {level} read at {address} failed");
                    WalkError::Read {
                        level,
                        address,
                        source,
                    }
                })?;
            trace!("{va}: {level} entry at {address} = {raw:#018x}");

            match walk.advance(raw) {
                Ok(Step::Next(next)) => walk = next,
                Ok(Step::Done(translation)) => {
                    debug!(
                        "{va} -> {} ({})",
                        translation.physical_address(),
                        translation.size()
                    );
                    return Ok(translation);
                }
                Err(e) => {
                    debug!("{e}");
                    return Err(e.into());
                }
            }
        }
    }

    /// Like [`walk`](Self::walk), returning only the physical address.
    ///
    /// # Errors
    /// See [`walk`](Self::walk).
    #[inline]
    pub fn translate(&self, va: VirtualAddress) -> Result<PhysicalAddress, WalkError<M::Error>> {
        self.walk(va).map(|t| t.physical_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MappingSize;
    use core::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("no memory at {0}")]
    struct Hole(PhysicalAddress);

    /// Fixed slice of `(address, value)` pairs that counts its reads.
    struct Table<'a> {
        entries: &'a [(u64, u64)],
        reads: Cell<usize>,
    }

    impl<'a> Table<'a> {
        fn new(entries: &'a [(u64, u64)]) -> Self {
            Self {
                entries,
                reads: Cell::new(0),
            }
        }
    }

    impl PhysicalMemory for Table<'_> {
        type Error = Hole;

        fn read_u64(&self, address: PhysicalAddress) -> Result<u64, Hole> {
            self.reads.set(self.reads.get() + 1);
            self.entries
                .iter()
                .find(|(a, _)| *a == address.as_u64())
                .map(|(_, v)| *v)
                .ok_or(Hole(address))
        }
    }

    const CHAIN: [(u64, u64); 4] = [
        (0x1000, 0x2003),
        (0x2000, 0x3003),
        (0x3010, 0x4003),
        (0x4008, 0x9003),
    ];

    #[test]
    fn translates_through_reader() {
        let memory = Table::new(&CHAIN);
        let walker = PageWalker::new(&memory, Cr3::from_bits(0x1000));
        let t = walker.walk(VirtualAddress::new(0x0040_1000)).unwrap();
        assert_eq!(t.physical_address(), PhysicalAddress::new(0x9000));
        assert_eq!(t.size(), MappingSize::Size4K);
        assert_eq!(memory.reads.get(), 4);

        assert_eq!(
            walker.translate(VirtualAddress::new(0x0040_1234)).unwrap(),
            PhysicalAddress::new(0x9234)
        );
    }

    #[test]
    fn missing_memory_is_a_read_error() {
        let memory = Table::new(&CHAIN[..2]);
        let walker = PageWalker::new(&memory, Cr3::from_bits(0x1000));
        let err = walker.walk(VirtualAddress::new(0x0040_1000)).unwrap_err();
        assert!(!err.is_not_present());
        assert_eq!(err.level(), LevelKind::Pd);
        match err {
            WalkError::Read { address, source, .. } => {
                assert_eq!(address, PhysicalAddress::new(0x3010));
                assert_eq!(source.0, address);
            }
            WalkError::NotPresent(e) => panic!("unexpected {e}"),
        }
        assert_eq!(memory.reads.get(), 3);
    }

    #[test]
    fn not_present_stops_reading() {
        let entries = [(0x1000, 0x2002), (0x2000, 0x3003)];
        let memory = Table::new(&entries);
        let walker = PageWalker::new(&memory, Cr3::from_bits(0x1000));
        let err = walker.walk(VirtualAddress::new(0x0040_1000)).unwrap_err();
        assert!(err.is_not_present());
        assert_eq!(err.level(), LevelKind::Pml4);
        assert_eq!(memory.reads.get(), 1);
    }

    #[test]
    fn read_error_keeps_source() {
        use core::error::Error;

        let memory = Table::new(&[]);
        let walker = PageWalker::new(&memory, Cr3::from_bits(0x1000));
        let err = walker.walk(VirtualAddress::new(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to read PML4 entry at 0x0000000000001000"
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no memory at 0x0000000000001000"));
    }
}
