use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::marker::PhantomData;

/// The offset within a page of size `S` (`0..S::SIZE`).
///
/// This is the part of a virtual address that survives translation unchanged:
/// 12 bits for a 4 KiB leaf, 21 bits for a 2 MiB page, 30 bits for a 1 GiB page.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddressOffset<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> MemoryAddressOffset<S> {
    /// Construct from a full address's offset bits.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        Self {
            value: addr.as_u64() & S::OFFSET_MASK,
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.value
    }
}

impl<S: PageSize> fmt::Debug for MemoryAddressOffset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset<{}>({:#X})", S::as_str(), self.value)
    }
}

impl<S: PageSize> From<MemoryAddress> for MemoryAddressOffset<S> {
    #[inline]
    fn from(addr: MemoryAddress) -> Self {
        Self::from_addr(addr)
    }
}
