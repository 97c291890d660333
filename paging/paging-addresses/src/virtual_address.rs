use crate::{MemoryAddress, MemoryAddressOffset, MemoryPage, PageSize};
use core::fmt;

/// Virtual memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses
/// of the address space being translated. It does not enforce canonicality:
/// a page walk consumes only bits `[47:0]`, and any 64-bit value is a valid
/// input. Use [`is_canonical`](Self::is_canonical) if the caller cares.
///
/// ### Examples
/// ```rust
/// # use paging_addresses::*;
/// let va = VirtualAddress::new(0xFFFF_FFFF_8000_1234);
/// let (vp, off) = va.split::<Size4K>();
/// assert_eq!(vp.base().as_u64(), 0xFFFF_FFFF_8000_1000);
/// assert_eq!(off.as_u64(), 0x234);
/// assert!(va.is_canonical());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Whether bits `[63:48]` are copies of bit 47.
    #[inline]
    #[must_use]
    pub const fn is_canonical(self) -> bool {
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let extended = ((self.as_u64() << 16) as i64 >> 16) as u64;
        extended == self.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> MemoryPage<S> {
        self.0.page::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> MemoryAddressOffset<S> {
        self.0.offset::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn split<S: PageSize>(self) -> (MemoryPage<S>, MemoryAddressOffset<S>) {
        (self.page::<S>(), self.offset::<S>())
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u64 {
    #[inline]
    fn from(v: VirtualAddress) -> Self {
        v.as_u64()
    }
}
