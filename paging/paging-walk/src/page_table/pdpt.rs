//! # x86-64 Page Directory Pointer Table Entry (PDPTE)
//!
//! - [`PdptEntry`]: the raw entry as fetched; may be a next-level pointer or a 1 GiB leaf.
//! - [`PdptView`]: decoded view chosen by the `PS` bit.
//! - [`Pdpte`]: non-leaf form, points to a Page Directory.
//! - [`Pdpte1G`]: leaf form, maps a 1 GiB page.
//!
//! ## Semantics
//!
//! At the PDPT level, the `PS` bit (bit 7) controls whether the entry is a
//! 1 GiB leaf (`PS=1`) or points to a Page Directory (`PS=0`). Leaf entries
//! carry the frame in bits 51:30 and keep VA bits 29:0 as the page offset.
//! Only a [`Pdpte`] can be used to locate the next table, and only a
//! [`Pdpte1G`] can resolve an address, so [`PdptEntry::view`] is the single
//! place where the flag is consulted.

use crate::bits::{PAGE_1G_ADDRESS_MASK, PAGE_SIZE_BIT, PRESENT_BIT, TABLE_BASE_MASK};
use crate::page_table::{PageEntry, TableReference, impl_page_entry_for_bitfield};
use bitfield_struct::bitfield;
use core::fmt;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size1G, Size4K, VirtualAddress};

/// Raw L3 **PDPTE** snapshot, before the `PS` bit has been interpreted.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PdptEntry(u64);

/// Decoded PDPT entry, selected by the `PS` bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PdptView {
    /// Non-leaf (`PS=0`): points to a Page Directory.
    Table(Pdpte),
    /// Leaf (`PS=1`): maps a 1 GiB page.
    Leaf1G(Pdpte1G),
}

/// L3 **PDPTE**: pointer to a **Page Directory** (non-leaf; PS **= 0**).
///
/// - Physical address (bits **51:12**) is a 4 KiB-aligned PD.
/// - Leaf-only fields (Dirty/Global) are ignored.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pdpte {
    /// Present (bit 0): valid entry if set.
    pub present: bool,
    /// Writable (bit 1): write permission.
    pub writable: bool,
    /// User (bit 2): user-mode access if set.
    pub user: bool,
    /// Write-Through (bit 3).
    pub write_through: bool,
    /// Cache Disable (bit 4).
    pub cache_disable: bool,
    /// Accessed (bit 5).
    pub accessed: bool,
    /// Dirty (bit 6): **ignored** in non-leaf form.
    #[bits(1)]
    __ignored_6: u8,
    /// PS (bit 7): **0** in non-leaf form.
    #[bits(1)]
    __ps_must_be_0: u8,
    /// Global (bit 8): **ignored** in non-leaf form.
    #[bits(1)]
    __ignored_8: u8,
    /// OS-available low (bits 9..10).
    #[bits(2)]
    pub os_available_low: u8,
    /// Restart (bit 11): ignored by ordinary paging.
    pub restart: bool,
    /// Next-level table physical address (bits 12..51, 4 KiB-aligned).
    #[bits(40)]
    phys_addr_51_12: u64,
    /// OS-available high (bits 52..62).
    #[bits(11)]
    pub os_available_high: u16,
    /// No-Execute (bit 63).
    pub no_execute: bool,
}

/// L3 **PDPTE (1 GiB leaf)**: maps a single 1 GiB page (`PS = 1`).
///
/// - **PAT** (Page Attribute Table) selector lives at bit **12** in this form.
/// - Physical address uses bits **51:30**; bits 29:13 are reserved.
/// - `Dirty` is set by CPU on first write; `Global` keeps TLB entries across
///   CR3 reload unless explicitly invalidated.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pdpte1G {
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
    /// **Dirty** (bit 6): set by CPU on first write to this 1 GiB page.
    pub dirty: bool,
    /// **Page Size** (bit 7): **1** for a 1 GiB leaf.
    #[bits(default = true)]
    pub page_size: bool,
    /// **Global** (bit 8): TLB entry not flushed on CR3 reload.
    pub global: bool,
    /// OS-available low (bits 9..10).
    #[bits(2)]
    pub os_available_low: u8,
    /// Restart (bit 11): ignored by ordinary paging.
    pub restart: bool,
    /// **PAT** selector for 1 GiB mappings (bit 12).
    pub pat_large: bool,
    /// Reserved (bits 13..29): must be 0.
    #[bits(17)]
    __reserved_13_29: u32,
    /// Physical address bits **51:30** (1 GiB-aligned base).
    #[bits(22)]
    phys_addr_51_30: u32,
    /// OS-available high (bits 52..58).
    #[bits(7)]
    pub os_available_high: u8,
    /// Protection Key (bits 59..62).
    #[bits(4)]
    pub protection_key: u8,
    /// No-Execute (bit 63).
    pub no_execute: bool,
}

impl PdptEntry {
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

    /// `PS` (bit 7): this entry maps a 1 GiB page directly.
    #[inline]
    #[must_use]
    pub const fn is_large_page(self) -> bool {
        self.0 & PAGE_SIZE_BIT != 0
    }

    /// **Typed read-only view** chosen by the **PS** bit.
    ///
    /// - If PS=1 → [`PdptView::Leaf1G`]
    /// - If PS=0 → [`PdptView::Table`]
    ///
    /// The present bit is not inspected.
    #[inline]
    #[must_use]
    pub const fn view(self) -> PdptView {
        if self.is_large_page() {
            PdptView::Leaf1G(Pdpte1G::from_bits(self.0))
        } else {
            PdptView::Table(Pdpte::from_bits(self.0))
        }
    }
}

impl fmt::Debug for PdptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdptEntry({:#018x})", self.0)
    }
}

impl PageEntry for PdptEntry {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        Self::from_bits(raw)
    }

    #[inline]
    fn into_raw(self) -> u64 {
        self.into_bits()
    }
}

impl From<Pdpte> for PdptEntry {
    #[inline]
    fn from(e: Pdpte) -> Self {
        Self(e.into_bits())
    }
}

impl From<Pdpte1G> for PdptEntry {
    #[inline]
    fn from(e: Pdpte1G) -> Self {
        Self(e.into_bits())
    }
}

impl Pdpte {
    /// Set the Page Directory base.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pd: PhysicalPage<Size4K>) -> Self {
        self.set_phys_addr_51_12(pd.base().as_u64() >> 12);
        self
    }

    /// The Page Directory this entry points to (bits 51:12).
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & TABLE_BASE_MASK))
    }
}

impl TableReference for Pdpte {
    #[inline]
    fn table_base(self) -> PhysicalPage<Size4K> {
        self.physical_address()
    }
}

impl Pdpte1G {
    /// Set the 1 GiB frame (must be 1 GiB-aligned).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_physical_page(mut self, page: PhysicalPage<Size1G>) -> Self {
        self.set_phys_addr_51_30((page.base().as_u64() >> 30) as u32);
        self.set_page_size(true);
        self
    }

    /// The mapped 1 GiB frame (bits 51:30).
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage<Size1G> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & PAGE_1G_ADDRESS_MASK))
    }

    /// Translate `va` through this leaf: frame bits 51:30 joined with VA bits 29:0.
    #[inline]
    #[must_use]
    pub const fn large_page_address(self, va: VirtualAddress) -> PhysicalAddress {
        self.physical_page().join(va.offset::<Size1G>())
    }
}

impl_page_entry_for_bitfield!(Pdpte, Pdpte1G);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{DIRTY_BIT, GLOBAL_BIT, LARGE_PAT_BIT, NO_EXECUTE_BIT, PROTECTION_KEY_MASK};

    #[test]
    fn pdpt_table_vs_1g() {
        let pd = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x2000_0000));
        let table = PdptEntry::from(Pdpte::new().with_present(true).with_physical_address(pd));
        assert!(!table.is_large_page());
        match table.view() {
            PdptView::Table(e) => assert_eq!(e.table_base().base().as_u64(), 0x2000_0000),
            PdptView::Leaf1G(_) => panic!("expected next PD"),
        }

        let g1 = PhysicalPage::<Size1G>::from_addr(PhysicalAddress::new(0x8000_0000));
        let leaf = PdptEntry::from(Pdpte1G::new().with_present(true).with_physical_page(g1));
        assert!(leaf.is_large_page());
        match leaf.view() {
            PdptView::Leaf1G(e) => assert_eq!(e.physical_page().base().as_u64(), 0x8000_0000),
            PdptView::Table(_) => panic!("expected 1GiB leaf"),
        }
    }

    #[test]
    fn large_page_law() {
        let frames = [0x4000_0000u64, 0x000F_FFFF_C000_0000, 0x0000_0123_4000_0000];
        let vas = [0x4000_0ABCu64, 0xFFFF_FFFF_FFFF_FFFF, 0x0000_7FFF_1234_5678, 0];
        for frame in frames {
            let raw = frame | PAGE_SIZE_BIT | PRESENT_BIT | NO_EXECUTE_BIT | LARGE_PAT_BIT;
            let PdptView::Leaf1G(leaf) = PdptEntry::from_bits(raw).view() else {
                panic!("PS set but not decoded as leaf");
            };
            for va in vas {
                let pa = leaf.large_page_address(VirtualAddress::new(va));
                assert_eq!(pa.as_u64(), (raw & PAGE_1G_ADDRESS_MASK) | (va & 0x3FFF_FFFF));
            }
        }
    }

    #[test]
    fn leaf_flag_positions() {
        let raw = PRESENT_BIT
            | DIRTY_BIT
            | PAGE_SIZE_BIT
            | GLOBAL_BIT
            | LARGE_PAT_BIT
            | PROTECTION_KEY_MASK
            | NO_EXECUTE_BIT;
        let e = Pdpte1G::from_bits(raw);
        assert!(e.dirty() && e.page_size() && e.global() && e.pat_large() && e.no_execute());
        assert_eq!(e.protection_key(), 0xF);
        assert_eq!(e.physical_page().base().as_u64(), 0);
        assert_eq!(u64::from(e.phys_addr_51_30()) << 30, raw & PAGE_1G_ADDRESS_MASK);
    }

    #[test]
    fn new_leaf_has_page_size_set() {
        assert!(PdptEntry::from(Pdpte1G::new()).is_large_page());
        assert!(!PdptEntry::from(Pdpte::new()).is_large_page());
    }
}
