use crate::bits::TABLE_BASE_MASK;
use crate::page_table::TableReference;
use bitfield_struct::bitfield;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// CR3: Page-Map Level-4 Base Register (IA-32e, PCID disabled).
///
/// The root pointer of a walk. Holds the physical base address of the PML4
/// table and the cache-control flags for accesses to it. For a foreign
/// address space this is simply the captured register value (e.g. from a VM
/// exit or a crash dump header).
#[bitfield(u64)]
pub struct Cr3 {
    /// Bits 0–2: ignored.
    #[bits(3)]
    __ignored_0_2: u8,

    /// Bit 3, PWT: Page-level Write-Through for PML4 accesses.
    pub pwt: bool,

    /// Bit 4, PCD: Page-level Cache Disable for PML4 accesses.
    pub pcd: bool,

    /// Bits 5–11: ignored (PCID when CR4.PCIDE = 1).
    #[bits(7)]
    __ignored_5_11: u8,

    /// Bits 12–51: PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63: reserved.
    #[bits(12)]
    __reserved_52_63: u16,
}

impl Cr3 {
    /// Create a `Cr3` value from a PML4 table page and cache flags.
    #[inline]
    #[must_use]
    pub const fn from_pml4_page(pml4: PhysicalPage<Size4K>, pwt: bool, pcd: bool) -> Self {
        Self::new()
            .with_pwt(pwt)
            .with_pcd(pcd)
            .with_pml4_base_4k(pml4.base().as_u64() >> 12)
    }

    /// The PML4 table page (bits 51:12; flag and reserved bits dropped).
    #[inline]
    #[must_use]
    pub const fn pml4_page(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(self.into_bits() & TABLE_BASE_MASK))
    }
}

impl TableReference for Cr3 {
    #[inline]
    fn table_base(self) -> PhysicalPage<Size4K> {
        self.pml4_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base_and_cache_flags() {
        let cr3 = Cr3::from_bits(0x8000_0000_0123_4018);
        assert!(cr3.pwt());
        assert!(cr3.pcd());
        assert_eq!(cr3.pml4_page().base().as_u64(), 0x0123_4000);
        assert_eq!(cr3.table_base(), cr3.pml4_page());
    }

    #[test]
    fn field_accessor_matches_mask() {
        let raw = 0xFFFF_FFFF_FFFF_FFFF;
        let cr3 = Cr3::from_bits(raw);
        assert_eq!(cr3.pml4_base_4k() << 12, raw & TABLE_BASE_MASK);
    }

    #[test]
    fn builds_from_page() {
        let page = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x7_FFFF_F000));
        let cr3 = Cr3::from_pml4_page(page, true, false);
        assert_eq!(cr3.into_bits(), 0x7_FFFF_F008);
        assert_eq!(cr3.pml4_page(), page);
    }
}
