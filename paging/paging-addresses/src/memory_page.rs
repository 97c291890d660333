use crate::{MemoryAddress, MemoryAddressOffset, PageSize};
use core::fmt;
use core::marker::PhantomData;

/// A page base address (lower `S::SHIFT` bits are zero).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryPage<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> MemoryPage<S> {
    /// Create from a raw address, aligning down to the page boundary.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        Self {
            value: addr.align_down::<S>().as_u64(),
            _phantom: PhantomData,
        }
    }

    /// Return the base as `MemoryAddress`.
    #[inline]
    #[must_use]
    pub const fn base(self) -> MemoryAddress {
        MemoryAddress::new(self.value)
    }

    /// Combine with an offset to form a full address.
    ///
    /// The base has its low `S::SHIFT` bits clear and the offset has no bits
    /// above them, so the two are merged with a bitwise OR.
    #[inline]
    #[must_use]
    pub const fn join(self, off: MemoryAddressOffset<S>) -> MemoryAddress {
        MemoryAddress::new(self.value | off.as_u64())
    }
}

impl<S: PageSize> fmt::Display for MemoryPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.value, S::as_str())
    }
}

impl<S: PageSize> fmt::Debug for MemoryPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryPage<{}>(0x{:016X})", S::as_str(), self.value)
    }
}

impl<S: PageSize> From<MemoryAddress> for MemoryPage<S> {
    #[inline]
    fn from(addr: MemoryAddress) -> Self {
        Self::from_addr(addr)
    }
}
