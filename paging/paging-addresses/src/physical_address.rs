use crate::{MemoryAddress, MemoryAddressOffset, PageSize, PhysicalPage};
use core::fmt;

/// Physical memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **physical** addresses:
/// the addresses of paging structures, of their entries, and the final result
/// of a translation. Like [`VirtualAddress`](super::VirtualAddress), this type
/// carries intent and prevents accidental VA/PA mix-ups.
///
/// ### Width
/// x86-64 paging entries carry at most [`MAX_BITS`](Self::MAX_BITS) = 52 bits
/// of physical address. Values produced by decoding entries never exceed
/// that; [`is_representable`](Self::is_representable) checks arbitrary values.
///
/// ### Examples
/// ```rust
/// # use paging_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
/// let (pp, off) = pa.split::<Size4K>();
/// assert_eq!(pp.base().as_u64(), 0x0000_0010_2000_0000);
/// assert_eq!(pp.join(off), pa);
/// assert!(pa.is_representable());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

impl PhysicalAddress {
    /// Architectural maximum physical-address width in bits.
    pub const MAX_BITS: u32 = 52;

    /// Mask of all bits a physical address may occupy (`[51:0]`).
    pub const MASK: u64 = (1 << Self::MAX_BITS) - 1;

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Whether no bit above [`MAX_BITS`](Self::MAX_BITS) is set.
    #[inline]
    #[must_use]
    pub const fn is_representable(self) -> bool {
        self.as_u64() & !Self::MASK == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned_to(self, align: u64) -> bool {
        self.0.is_aligned_to(align)
    }

    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::from_addr(self)
    }

    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> MemoryAddressOffset<S> {
        self.0.offset::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn split<S: PageSize>(self) -> (PhysicalPage<S>, MemoryAddressOffset<S>) {
        (self.page::<S>(), self.offset::<S>())
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(v: PhysicalAddress) -> Self {
        v.as_u64()
    }
}

impl<S: PageSize> From<PhysicalPage<S>> for PhysicalAddress {
    #[inline]
    fn from(value: PhysicalPage<S>) -> Self {
        value.base()
    }
}
