//! # Paging Levels
//!
//! The four levels of 4-level paging as zero-sized marker types sharing one
//! [`PagingLevel`] interface. A level fixes the virtual-address bits its index
//! comes from, which entry type may locate its table ([`PagingLevel::Parent`]),
//! and which entry type its table stores ([`PagingLevel::Entry`]).
//!
//! | Marker | Table | Index bits | Parent | Entry |
//! |:-------|:------|:-----------|:-------|:------|
//! | [`Pml4`] | PML4 (root) | `[47:39]` | [`Cr3`] | [`Pml4e`] |
//! | [`Pdpt`] | PDPT | `[38:30]` | [`Pml4e`] | [`PdptEntry`] |
//! | [`Pd`] | PD | `[29:21]` | [`Pdpte`] | [`PdEntry`] |
//! | [`Pt`] | PT (leaf) | `[20:12]` | [`Pde`] | [`Pte`] |
//!
//! Large-page leaves ([`Pdpte1G`](crate::Pdpte1G), [`Pde2M`](crate::Pde2M))
//! are not [`TableReference`]s, so handing one to the next level does not
//! compile.

use crate::bits::{ENTRY_SIZE, INDEX_MASK};
use crate::page_table::{PageEntry, PdEntry, PdptEntry, TableReference};
use crate::{Cr3, Pde, Pdpte, Pml4e, Pte};
use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use paging_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};

/// Sealed trait pattern to restrict `PagingLevel` impls to the four levels.
mod sealed {
    pub trait Sealed {}
}

/// Untyped name of a paging level, for errors, logs and walk paths.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LevelKind {
    /// Page Map Level 4 (root table, referenced by CR3).
    #[default]
    Pml4,
    /// Page Directory Pointer Table.
    Pdpt,
    /// Page Directory.
    Pd,
    /// Page Table (leaf table).
    Pt,
}

impl LevelKind {
    /// Extract this level's table index from `va`, as a plain `0..512` value.
    #[inline]
    #[must_use]
    pub const fn index_of(self, va: VirtualAddress) -> u16 {
        match self {
            Self::Pml4 => TableIndex::<Pml4>::from_va(va).as_u16(),
            Self::Pdpt => TableIndex::<Pdpt>::from_va(va).as_u16(),
            Self::Pd => TableIndex::<Pd>::from_va(va).as_u16(),
            Self::Pt => TableIndex::<Pt>::from_va(va).as_u16(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pml4 => "PML4",
            Self::Pdpt => "PDPT",
            Self::Pd => "PD",
            Self::Pt => "PT",
        }
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One level of the 4-level paging hierarchy.
///
/// The provided methods are the per-level address arithmetic:
/// [`index`](Self::index), [`table_base`](Self::table_base) and
/// [`entry_address`](Self::entry_address). None of them inspect the present
/// bit; the caller checks presence of `parent` before using it here.
pub trait PagingLevel:
    sealed::Sealed + Copy + Clone + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    const KIND: LevelKind;

    /// Position of the least significant index bit in the virtual address.
    const INDEX_SHIFT: u32;

    /// The value whose table-base field locates this level's table.
    type Parent: TableReference;

    /// The entry type stored in this level's table.
    type Entry: PageEntry;

    /// Index into this level's table for `va` (`0..512`, not scaled).
    #[inline]
    #[must_use]
    fn index(va: VirtualAddress) -> TableIndex<Self> {
        TableIndex::from_va(va)
    }

    /// Physical base of this level's table, taken from `parent` bits 51:12.
    #[inline]
    #[must_use]
    fn table_base(parent: Self::Parent) -> PhysicalPage<Size4K> {
        parent.table_base()
    }

    /// Physical address of the entry for `va` in the table located by `parent`.
    #[inline]
    #[must_use]
    fn entry_address(parent: Self::Parent, va: VirtualAddress) -> PhysicalAddress {
        Self::index(va).entry_address(Self::table_base(parent))
    }
}

/// Root level: the PML4 table located by CR3.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pml4;

/// Second level: the Page Directory Pointer Table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pdpt;

/// Third level: the Page Directory.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pd;

/// Leaf level: the Page Table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pt;

impl sealed::Sealed for Pml4 {}
impl PagingLevel for Pml4 {
    const KIND: LevelKind = LevelKind::Pml4;
    const INDEX_SHIFT: u32 = 39;
    type Parent = Cr3;
    type Entry = Pml4e;
}

impl sealed::Sealed for Pdpt {}
impl PagingLevel for Pdpt {
    const KIND: LevelKind = LevelKind::Pdpt;
    const INDEX_SHIFT: u32 = 30;
    type Parent = Pml4e;
    type Entry = PdptEntry;
}

impl sealed::Sealed for Pd {}
impl PagingLevel for Pd {
    const KIND: LevelKind = LevelKind::Pd;
    const INDEX_SHIFT: u32 = 21;
    type Parent = Pdpte;
    type Entry = PdEntry;
}

impl sealed::Sealed for Pt {}
impl PagingLevel for Pt {
    const KIND: LevelKind = LevelKind::Pt;
    const INDEX_SHIFT: u32 = 12;
    type Parent = Pde;
    type Entry = Pte;
}

/// Index into a table of level `L` (`0..512`).
///
/// The level is part of the type, so a PD index cannot be used to address a
/// PT. The value is the slot number, **not** the byte offset: scaling by the
/// 8-byte entry size happens in [`entry_address`](Self::entry_address) only.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex<L: PagingLevel> {
    value: u16,
    _level: PhantomData<L>,
}

impl<L: PagingLevel> TableIndex<L> {
    /// Extract bits `[L::INDEX_SHIFT + 8 : L::INDEX_SHIFT]` of `va`.
    ///
    /// Any 64-bit input is valid; bits outside the field are discarded.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_va(va: VirtualAddress) -> Self {
        Self::new((va.as_u64() >> L::INDEX_SHIFT) as u16)
    }

    /// Construct from a raw slot number, keeping its low 9 bits.
    ///
    /// Values of 512 and above wrap, so the entry address always stays
    /// inside its table.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(v: u16) -> Self {
        Self {
            value: v & INDEX_MASK as u16,
            _level: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.value
    }

    /// Byte offset of the selected entry within its table (`index * 8`).
    #[inline]
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.value as u64 * ENTRY_SIZE
    }

    /// Physical address of the selected entry in the table at `table`.
    ///
    /// Computed as `table | (index * 8)`. The OR is exact because a
    /// [`PhysicalPage<Size4K>`] has its low 12 bits clear and the byte offset
    /// never exceeds `511 * 8 = 0xFF8`.
    #[inline]
    #[must_use]
    pub const fn entry_address(self, table: PhysicalPage<Size4K>) -> PhysicalAddress {
        PhysicalAddress::new(table.base().as_u64() | self.byte_offset())
    }
}

impl<L: PagingLevel> fmt::Debug for TableIndex<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", L::KIND, self.value)
    }
}

/// All four table indices of `va`, root first.
#[inline]
#[must_use]
pub const fn split_indices(
    va: VirtualAddress,
) -> (
    TableIndex<Pml4>,
    TableIndex<Pdpt>,
    TableIndex<Pd>,
    TableIndex<Pt>,
) {
    (
        TableIndex::from_va(va),
        TableIndex::from_va(va),
        TableIndex::from_va(va),
        TableIndex::from_va(va),
    )
}
