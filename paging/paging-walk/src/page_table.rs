//! # Paging-Structure Entries
//!
//! Typed views of the 64-bit entries found at each level. Each level has its
//! own module, mirroring the hardware tables:
//!
//! - [`pml4`]: [`Pml4e`](pml4::Pml4e), always a next-table pointer.
//! - [`pdpt`]: [`PdptEntry`](pdpt::PdptEntry), either a next-table pointer or a 1 GiB leaf.
//! - [`pd`]: [`PdEntry`](pd::PdEntry), either a next-table pointer or a 2 MiB leaf.
//! - [`pt`]: [`Pte`](pt::Pte), always a 4 KiB leaf.
//!
//! Decoding never validates anything: a raw value goes in, fields come out.
//! Presence is the caller's check; see [`PageEntry::present`].

pub mod pd;
pub mod pdpt;
pub mod pml4;
pub mod pt;

use crate::bits::PRESENT_BIT;
use paging_addresses::{PhysicalPage, Size4K};

pub use crate::page_table::pd::PdEntry;
pub use crate::page_table::pdpt::PdptEntry;

/// The decode capability shared by the entry type of every level.
pub trait PageEntry: Copy {
    /// Wrap a raw 64-bit entry as fetched from physical memory.
    fn from_raw(raw: u64) -> Self;

    /// The raw 64-bit entry.
    fn into_raw(self) -> u64;

    /// Present (bit 0). Must be checked before any other field is trusted.
    #[inline]
    fn present(self) -> bool {
        self.into_raw() & PRESENT_BIT != 0
    }
}

/// A value that locates a next-level table through bits 51:12.
///
/// Implemented by [`Cr3`](crate::Cr3), [`Pml4e`](pml4::Pml4e),
/// [`Pdpte`](pdpt::Pdpte) and [`Pde`](pd::Pde); never by leaf forms.
pub trait TableReference: Copy {
    /// The 4 KiB-aligned table base, with flags and bits above 51 masked off.
    ///
    /// The present bit is not inspected.
    fn table_base(self) -> PhysicalPage<Size4K>;
}

macro_rules! impl_page_entry_for_bitfield {
    ($($entry:ty),*) => {
        $(
            impl $crate::page_table::PageEntry for $entry {
                #[inline]
                fn from_raw(raw: u64) -> Self {
                    Self::from_bits(raw)
                }

                #[inline]
                fn into_raw(self) -> u64 {
                    self.into_bits()
                }
            }
        )*
    };
}

pub(crate) use impl_page_entry_for_bitfield;
