//! # x86-64 Page Map Level 4 Entry (PML4E)
//!
//! The root level. A PML4E always points to a Page-Directory-Pointer Table;
//! there are no large pages at this level, so bit 7 is reserved and the walk
//! never consults it here.

use crate::bits::TABLE_BASE_MASK;
use crate::page_table::{TableReference, impl_page_entry_for_bitfield};
use bitfield_struct::bitfield;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// L4 **PML4E**: pointer to a **PDPT** (non-leaf; PS **must be 0**).
///
/// This entry never maps memory directly. Bits that are meaningful only on
/// leaf entries (e.g., `dirty`, `global`) are ignored here.
///
/// - Physical address (bits **51:12**) is a 4 KiB-aligned PDPT.
/// - `NX` participates in permission intersection across the walk.
///
/// Reference: AMD APM / Intel SDM paging structures (x86-64).
#[doc(alias = "PML4E")]
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Pml4e {
    /// **Present** (bit 0): valid entry if set.
    ///
    /// When clear, the entry is not present and all other fields are ignored.
    pub present: bool,

    /// **Writable** (bit 1): write permission for the 512 GiB region.
    pub writable: bool,

    /// **User/Supervisor** (bit 2): allow user-mode access if set.
    pub user: bool,

    /// **Page Write-Through** (PWT, bit 3) for accesses to the PDPT.
    pub write_through: bool,

    /// **Page Cache Disable** (PCD, bit 4) for accesses to the PDPT.
    pub cache_disable: bool,

    /// **Accessed** (A, bit 5): set by the CPU on first use of this entry.
    pub accessed: bool,

    /// (bit 6): ignored.
    #[bits(1)]
    __ignored_6: u8,

    /// **Page Size** (bit 7): reserved, must be 0.
    #[bits(1)]
    __reserved_7: u8,

    /// (bit 8): ignored.
    #[bits(1)]
    __ignored_8: u8,

    /// **OS-available low** (bits 9..10): not interpreted by hardware.
    #[bits(2)]
    pub os_available_low: u8,

    /// **Restart** (bit 11): ignored by ordinary paging; HLAT restart flag.
    pub restart: bool,

    /// **Next-level table physical address** (bits 12..51).
    #[bits(40)]
    phys_addr_51_12: u64,

    /// **OS-available high** (bits 52..62): ignored by hardware.
    #[bits(11)]
    pub os_available_high: u16,

    /// **No-Execute** (NX, bit 63 / XD on Intel).
    pub no_execute: bool,
}

impl Pml4e {
    /// Set the PDPT base address.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pdpt: PhysicalPage<Size4K>) -> Self {
        self.set_phys_addr_51_12(pdpt.base().as_u64() >> 12);
        self
    }

    /// The PDPT this entry points to (bits 51:12).
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & TABLE_BASE_MASK))
    }
}

impl TableReference for Pml4e {
    #[inline]
    fn table_base(self) -> PhysicalPage<Size4K> {
        self.physical_address()
    }
}

impl_page_entry_for_bitfield!(Pml4e);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{
        ACCESSED_BIT, CACHE_DISABLE_BIT, NO_EXECUTE_BIT, PRESENT_BIT, RESTART_BIT, USER_BIT,
        WRITABLE_BIT, WRITE_THROUGH_BIT,
    };
    use crate::page_table::PageEntry;

    #[test]
    fn pml4_points_to_pdpt() {
        let pdpt = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x1234_5000));
        let e = Pml4e::new()
            .with_present(true)
            .with_writable(true)
            .with_physical_address(pdpt);
        assert!(PageEntry::present(e));
        assert_eq!(e.table_base().base().as_u64(), 0x1234_5000);
        assert_eq!(e.into_bits(), 0x1234_5003);
    }

    #[test]
    fn flag_positions() {
        let e = Pml4e::from_bits(
            PRESENT_BIT
                | WRITABLE_BIT
                | USER_BIT
                | WRITE_THROUGH_BIT
                | CACHE_DISABLE_BIT
                | ACCESSED_BIT
                | RESTART_BIT
                | NO_EXECUTE_BIT,
        );
        assert!(e.present() && e.writable() && e.user());
        assert!(e.write_through() && e.cache_disable() && e.accessed());
        assert!(e.restart() && e.no_execute());
        assert_eq!(e.os_available_low(), 0);
        assert_eq!(e.physical_address().base().as_u64(), 0);
    }

    #[test]
    fn table_base_is_idempotent() {
        for raw in [0u64, u64::MAX, 0x8000_0000_DEAD_BFFF, 0x0010_0000_0000_1001] {
            let once = Pml4e::from_bits(raw).table_base();
            let twice = Pml4e::from_bits(once.base().as_u64()).table_base();
            assert_eq!(once, twice);
            assert_eq!(once.base().as_u64(), raw & TABLE_BASE_MASK);
            assert_eq!(Pml4e::from_bits(raw).phys_addr_51_12() << 12, raw & TABLE_BASE_MASK);
        }
    }

    #[test]
    fn table_base_ignores_present_bit() {
        let e = Pml4e::from_bits(0x0000_0000_0000_5000);
        assert!(!PageEntry::present(e));
        assert_eq!(e.table_base().base().as_u64(), 0x5000);
    }
}
