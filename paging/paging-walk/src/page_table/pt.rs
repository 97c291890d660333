//! # x86-64 Page Table Entry (PTE)
//!
//! The leaf level. Every present PTE maps exactly one 4 KiB page; bit 7 is
//! the PAT selector here, not a page-size flag, so there is no large-page
//! query on this type.

use crate::bits::TABLE_BASE_MASK;
use crate::page_table::impl_page_entry_for_bitfield;
use bitfield_struct::bitfield;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};

/// L1 **PTE**: maps a single 4 KiB page.
#[doc(alias = "PTE")]
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pte {
    /// Present (bit 0).
    pub present: bool,
    /// Writable (bit 1).
    pub writable: bool,
    /// User (bit 2).
    pub user: bool,
    /// Write-Through (bit 3).
    pub write_through: bool,
    /// Cache Disable (bit 4).
    pub cache_disable: bool,
    /// Accessed (bit 5).
    pub accessed: bool,
    /// Dirty (bit 6): set by the CPU on first write to the page.
    pub dirty: bool,
    /// PAT (bit 7): page attribute table selector.
    pub pat: bool,
    /// Global (bit 8).
    pub global: bool,
    /// OS-available low (bits 9..10).
    #[bits(2)]
    pub os_available_low: u8,
    /// Restart (bit 11).
    pub restart: bool,
    /// Page frame physical address (bits 12..51).
    #[bits(40)]
    phys_addr_51_12: u64,
    /// OS-available high (bits 52..58).
    #[bits(7)]
    pub os_available_high: u8,
    /// Protection Key (bits 59..62).
    #[bits(4)]
    pub protection_key: u8,
    /// No-Execute (bit 63).
    pub no_execute: bool,
}

impl Pte {
    /// Set the mapped 4 KiB frame.
    #[inline]
    #[must_use]
    pub const fn with_physical_page(mut self, page: PhysicalPage<Size4K>) -> Self {
        self.set_phys_addr_51_12(page.base().as_u64() >> 12);
        self
    }

    /// The mapped 4 KiB frame (bits 51:12).
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & TABLE_BASE_MASK))
    }

    /// Final translation of `va`: frame bits 51:12 joined with VA bits 11:0.
    #[inline]
    #[must_use]
    pub const fn final_address(self, va: VirtualAddress) -> PhysicalAddress {
        self.physical_page().join(va.offset::<Size4K>())
    }
}

impl_page_entry_for_bitfield!(Pte);
