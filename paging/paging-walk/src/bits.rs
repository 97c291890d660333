//! # Paging-Structure Layout Constants
//!
//! Bit positions and masks shared by all four levels of 4-level paging.
//! The typed entries in [`page_table`](crate::page_table) decode the same
//! layout through bitfields; the unit tests below cross-check both.

/// Present (bit 0). A clear bit invalidates the entry and the whole walk.
pub const PRESENT_BIT: u64 = 1 << 0;

/// Read/write (bit 1).
pub const WRITABLE_BIT: u64 = 1 << 1;

/// User/supervisor (bit 2).
pub const USER_BIT: u64 = 1 << 2;

/// Page-level write-through (PWT, bit 3).
pub const WRITE_THROUGH_BIT: u64 = 1 << 3;

/// Page-level cache disable (PCD, bit 4).
pub const CACHE_DISABLE_BIT: u64 = 1 << 4;

/// Accessed (bit 5).
pub const ACCESSED_BIT: u64 = 1 << 5;

/// Dirty (bit 6); leaf forms only.
pub const DIRTY_BIT: u64 = 1 << 6;

/// Page size (PS, bit 7) on PDPTEs and PDEs. On a PTE this bit is PAT.
pub const PAGE_SIZE_BIT: u64 = 1 << 7;

/// Global (bit 8); leaf forms only.
pub const GLOBAL_BIT: u64 = 1 << 8;

/// Bit 11: ignored by ordinary paging (HLAT restart when HLAT is active).
pub const RESTART_BIT: u64 = 1 << 11;

/// PAT selector of 2 MiB and 1 GiB leaves (bit 12).
pub const LARGE_PAT_BIT: u64 = 1 << 12;

/// Protection key of leaf forms (bits 62:59).
pub const PROTECTION_KEY_MASK: u64 = 0xF << 59;

/// Execute-disable (XD/NX, bit 63).
pub const NO_EXECUTE_BIT: u64 = 1 << 63;

/// Next-table base in CR3, PML4Es, PDPTEs and PDEs; 4 KiB frame in PTEs (bits 51:12).
pub const TABLE_BASE_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Frame of a 1 GiB leaf PDPTE (bits 51:30).
pub const PAGE_1G_ADDRESS_MASK: u64 = 0x000F_FFFF_C000_0000;

/// Frame of a 2 MiB leaf PDE (bits 51:21).
pub const PAGE_2M_ADDRESS_MASK: u64 = 0x000F_FFFF_FFE0_0000;

/// Width of every table index.
pub const INDEX_BITS: u32 = 9;

/// Mask applied to a shifted virtual address to obtain a table index.
pub const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Size of one paging-structure entry in bytes.
pub const ENTRY_SIZE: u64 = 8;

/// Entries per paging-structure table.
pub const ENTRIES_PER_TABLE: usize = 512;

#[cfg(test)]
mod tests {
    use super::*;
    use paging_addresses::{PageSize, PhysicalAddress, Size1G, Size2M, Size4K};

    #[test]
    fn masks_are_derived_consistently() {
        assert_eq!(INDEX_MASK, 0x1FF);
        assert_eq!(ENTRIES_PER_TABLE as u64 * ENTRY_SIZE, Size4K::SIZE);
        assert_eq!(TABLE_BASE_MASK, PhysicalAddress::MASK & !Size4K::OFFSET_MASK);
        assert_eq!(PAGE_2M_ADDRESS_MASK, PhysicalAddress::MASK & !Size2M::OFFSET_MASK);
        assert_eq!(PAGE_1G_ADDRESS_MASK, PhysicalAddress::MASK & !Size1G::OFFSET_MASK);
    }

    #[test]
    fn flag_bits_are_disjoint_from_address_fields() {
        let flags = PRESENT_BIT
            | WRITABLE_BIT
            | USER_BIT
            | WRITE_THROUGH_BIT
            | CACHE_DISABLE_BIT
            | ACCESSED_BIT
            | DIRTY_BIT
            | PAGE_SIZE_BIT
            | GLOBAL_BIT
            | RESTART_BIT
            | PROTECTION_KEY_MASK
            | NO_EXECUTE_BIT;
        assert_eq!(flags & TABLE_BASE_MASK, 0);
        assert_eq!(LARGE_PAT_BIT & PAGE_2M_ADDRESS_MASK, 0);
        assert_eq!(LARGE_PAT_BIT & PAGE_1G_ADDRESS_MASK, 0);
    }
}
