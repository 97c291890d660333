use crate::{MemoryAddressOffset, MemoryPage, PageSize, PhysicalAddress};
use core::fmt;

/// Physical memory page base for size `S`.
///
/// A `PhysicalPage<S>` is the **page-aligned base** of a physical page of size
/// `S`: a paging-structure table (always [`Size4K`](crate::Size4K)) or the
/// frame mapped by a leaf entry.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero, so combining it
///   with an index or offset by bitwise OR can never disturb the base.
///
/// ### Examples
/// ```rust
/// # use paging_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0008_1234_5678);
/// let pp = pa.page::<Size2M>();
/// assert_eq!(pp.base().as_u64(), 0x0000_0008_1220_0000);
/// assert_eq!(pp.join(pa.offset::<Size2M>()), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(MemoryPage<S>);

impl<S: PageSize> PhysicalPage<S> {
    /// The page containing `p` (aligns down).
    #[inline]
    #[must_use]
    pub const fn from_addr(p: PhysicalAddress) -> Self {
        Self(MemoryPage::from_addr(p.0))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress(self.0.base())
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: MemoryAddressOffset<S>) -> PhysicalAddress {
        PhysicalAddress(self.0.join(off))
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>(0x{:016X})",
            S::as_str(),
            self.0.base().as_u64()
        )
    }
}

impl<S: PageSize> From<MemoryPage<S>> for PhysicalPage<S> {
    #[inline]
    fn from(p: MemoryPage<S>) -> Self {
        Self(p)
    }
}
