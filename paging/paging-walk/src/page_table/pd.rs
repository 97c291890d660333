//! # x86-64 Page Directory Entry (PDE)
//!
//! - [`PdEntry`]: the raw entry as fetched; may be a next-level pointer or a 2 MiB leaf.
//! - [`PdView`]: decoded view chosen by the `PS` bit.
//! - [`Pde`]: non-leaf form, points to a Page Table.
//! - [`Pde2M`]: leaf form, maps a 2 MiB page.
//!
//! The 2 MiB leaf carries its frame in bits 51:21 and keeps VA bits 20:0 as
//! the page offset.

use crate::bits::{PAGE_2M_ADDRESS_MASK, PAGE_SIZE_BIT, PRESENT_BIT, TABLE_BASE_MASK};
use crate::page_table::{PageEntry, TableReference, impl_page_entry_for_bitfield};
use bitfield_struct::bitfield;
use core::fmt;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size2M, Size4K, VirtualAddress};

/// Raw L2 **PDE** snapshot, before the `PS` bit has been interpreted.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PdEntry(u64);

/// Decoded PD entry, selected by the `PS` bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PdView {
    /// Non-leaf (`PS=0`): points to a Page Table.
    Table(Pde),
    /// Leaf (`PS=1`): maps a 2 MiB page.
    Leaf2M(Pde2M),
}

/// L2 **PDE**: pointer to a **Page Table** (non-leaf; PS **= 0**).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pde {
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
    #[bits(1)]
    __ignored_6: u8,
    #[bits(1)]
    __ps_must_be_0: u8,
    #[bits(1)]
    __ignored_8: u8,
    /// OS-available low (bits 9..10).
    #[bits(2)]
    pub os_available_low: u8,
    /// Restart (bit 11).
    pub restart: bool,
    /// Page Table physical address (bits 12..51).
    #[bits(40)]
    phys_addr_51_12: u64,
    /// OS-available high (bits 52..62).
    #[bits(11)]
    pub os_available_high: u16,
    /// No-Execute (bit 63).
    pub no_execute: bool,
}

/// L2 **PDE (2 MiB leaf)**: maps a single 2 MiB page (`PS = 1`).
///
/// - **PAT** selector at bit **12**; bits 20:13 are reserved.
/// - Physical address uses bits **51:21**.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pde2M {
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
    /// Dirty (bit 6).
    pub dirty: bool,
    /// Page Size (bit 7): **1** for a 2 MiB leaf.
    #[bits(default = true)]
    pub page_size: bool,
    /// Global (bit 8).
    pub global: bool,
    /// OS-available low (bits 9..10).
    #[bits(2)]
    pub os_available_low: u8,
    /// Restart (bit 11).
    pub restart: bool,
    /// PAT selector for 2 MiB mappings (bit 12).
    pub pat_large: bool,
    /// Reserved (bits 13..20): must be 0.
    #[bits(8)]
    __reserved_13_20: u8,
    /// Physical address bits **51:21** (2 MiB-aligned base).
    #[bits(31)]
    phys_addr_51_21: u32,
    /// OS-available high (bits 52..58).
    #[bits(7)]
    pub os_available_high: u8,
    /// Protection Key (bits 59..62).
    #[bits(4)]
    pub protection_key: u8,
    /// No-Execute (bit 63).
    pub no_execute: bool,
}

impl PdEntry {
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn present(self) -> bool {
        self.0 & PRESENT_BIT != 0
    }

    /// `PS` (bit 7): this entry maps a 2 MiB page directly.
    #[inline]
    #[must_use]
    pub const fn is_large_page(self) -> bool {
        self.0 & PAGE_SIZE_BIT != 0
    }

    /// **Typed read-only view** chosen by the **PS** bit.
    ///
    /// The present bit is not inspected.
    #[inline]
    #[must_use]
    pub const fn view(self) -> PdView {
        if self.is_large_page() {
            PdView::Leaf2M(Pde2M::from_bits(self.0))
        } else {
            PdView::Table(Pde::from_bits(self.0))
        }
    }
}

impl fmt::Debug for PdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdEntry({:#018x})", self.0)
    }
}

impl PageEntry for PdEntry {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        Self::from_bits(raw)
    }

    #[inline]
    fn into_raw(self) -> u64 {
        self.into_bits()
    }
}

impl From<Pde> for PdEntry {
    #[inline]
    fn from(e: Pde) -> Self {
        Self(e.into_bits())
    }
}

impl From<Pde2M> for PdEntry {
    #[inline]
    fn from(e: Pde2M) -> Self {
        Self(e.into_bits())
    }
}

impl Pde {
    /// Set the Page Table base.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pt: PhysicalPage<Size4K>) -> Self {
        self.set_phys_addr_51_12(pt.base().as_u64() >> 12);
        self
    }

    /// The Page Table this entry points to (bits 51:12).
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & TABLE_BASE_MASK))
    }
}

impl TableReference for Pde {
    #[inline]
    fn table_base(self) -> PhysicalPage<Size4K> {
        self.physical_address()
    }
}

impl Pde2M {
    /// Set the 2 MiB frame (must be 2 MiB-aligned).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_physical_page(mut self, page: PhysicalPage<Size2M>) -> Self {
        self.set_phys_addr_51_21((page.base().as_u64() >> 21) as u32);
        self.set_page_size(true);
        self
    }

    /// The mapped 2 MiB frame (bits 51:21).
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage<Size2M> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & PAGE_2M_ADDRESS_MASK))
    }

    /// Translate `va` through this leaf: frame bits 51:21 joined with VA bits 20:0.
    #[inline]
    #[must_use]
    pub const fn large_page_address(self, va: VirtualAddress) -> PhysicalAddress {
        self.physical_page().join(va.offset::<Size2M>())
    }
}

impl_page_entry_for_bitfield!(Pde, Pde2M);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{DIRTY_BIT, GLOBAL_BIT, LARGE_PAT_BIT, NO_EXECUTE_BIT, WRITABLE_BIT};

    #[test]
    fn pd_table_vs_2m() {
        let pt = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x3000_0000));
        let table = PdEntry::from(Pde::new().with_present(true).with_physical_address(pt));
        match table.view() {
            PdView::Table(e) => assert_eq!(e.table_base().base().as_u64(), 0x3000_0000),
            PdView::Leaf2M(_) => panic!("expected next PT"),
        }

        let m2 = PhysicalPage::<Size2M>::from_addr(PhysicalAddress::new(0x0040_0000));
        let leaf = PdEntry::from(Pde2M::new().with_present(true).with_physical_page(m2));
        match leaf.view() {
            PdView::Leaf2M(e) => assert_eq!(e.physical_page().base().as_u64(), 0x0040_0000),
            PdView::Table(_) => panic!("expected 2MiB leaf"),
        }
    }

    #[test]
    fn large_page_law() {
        let frames = [0x0020_0000u64, 0x000F_FFFF_FFE0_0000, 0x0000_0001_2340_0000];
        let vas = [0x0040_1ABCu64, 0xFFFF_FFFF_FFFF_FFFF, 0x0000_7FFF_1234_5678, 0];
        for frame in frames {
            let raw = frame | PAGE_SIZE_BIT | PRESENT_BIT | WRITABLE_BIT | LARGE_PAT_BIT;
            let PdView::Leaf2M(leaf) = PdEntry::from_bits(raw).view() else {
                panic!("PS set but not decoded as leaf");
            };
            for va in vas {
                let pa = leaf.large_page_address(VirtualAddress::new(va));
                assert_eq!(pa.as_u64(), (raw & PAGE_2M_ADDRESS_MASK) | (va & 0x1F_FFFF));
            }
        }
    }

    #[test]
    fn pat_bit_does_not_leak_into_frame() {
        let raw = 0x0000_0000_0060_1000 | PAGE_SIZE_BIT | PRESENT_BIT;
        let PdView::Leaf2M(leaf) = PdEntry::from_bits(raw).view() else {
            panic!("expected 2MiB leaf");
        };
        assert!(leaf.pat_large());
        assert_eq!(leaf.physical_page().base().as_u64(), 0x0060_0000);
        assert_eq!(u64::from(leaf.phys_addr_51_21()) << 21, 0x0060_0000);
    }

    #[test]
    fn leaf_flag_positions() {
        let e = Pde2M::from_bits(DIRTY_BIT | GLOBAL_BIT | NO_EXECUTE_BIT);
        assert!(e.dirty() && e.global() && e.no_execute());
        assert!(!e.page_size() && !e.writable());
    }
}
