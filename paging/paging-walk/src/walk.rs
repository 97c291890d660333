//! # The Walk Protocol
//!
//! [`Walk`] is the translation algorithm without any I/O. It names the
//! physical address it needs next, the caller fetches the 64-bit value stored
//! there however it can (hypervisor GPA read, dump file, debugger transport),
//! and [`Walk::advance`] consumes it:
//!
//! ```text
//! Walk::new(cr3, va) ─► pending() = (PML4, addr) ─► advance(raw) ─┬─► Step::Next(walk)  (repeat)
//!                                                                 ├─► Step::Done(translation)
//!                                                                 └─► Err(NotPresent)
//! ```
//!
//! At most four values are consumed. `advance` takes `self` by value, so a
//! finished or failed walk cannot be fed again.

use crate::level::{LevelKind, PagingLevel, Pd, Pdpt, Pml4, Pt};
use crate::page_table::PageEntry;
use crate::{Cr3, PdEntry, PdView, PdptEntry, PdptView};
use core::fmt;
use paging_addresses::{PageSize, PhysicalAddress, Size1G, Size2M, Size4K, VirtualAddress};

/// The granule a translation resolved to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MappingSize {
    /// 4 KiB page mapped by a PTE.
    Size4K,
    /// 2 MiB page mapped by a PDE with `PS=1`.
    Size2M,
    /// 1 GiB page mapped by a PDPTE with `PS=1`.
    Size1G,
}

impl MappingSize {
    /// Page size in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Size4K => Size4K::SIZE,
            Self::Size2M => Size2M::SIZE,
            Self::Size1G => Size1G::SIZE,
        }
    }

    /// Mask of the virtual-address bits kept as the page offset.
    #[inline]
    #[must_use]
    pub const fn offset_mask(self) -> u64 {
        self.bytes() - 1
    }

    /// The level whose entry terminates a walk of this size.
    #[inline]
    #[must_use]
    pub const fn leaf_level(self) -> LevelKind {
        match self {
            Self::Size4K => LevelKind::Pt,
            Self::Size2M => LevelKind::Pd,
            Self::Size1G => LevelKind::Pdpt,
        }
    }
}

impl fmt::Display for MappingSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Size4K => "4 KiB",
            Self::Size2M => "2 MiB",
            Self::Size1G => "1 GiB",
        })
    }
}

/// One fetched entry of a walk.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WalkStep {
    pub level: LevelKind,
    /// Slot number in the level's table (`0..512`).
    pub index: u16,
    pub entry_address: PhysicalAddress,
    /// The raw entry value as supplied by the caller.
    pub entry: u64,
}

impl fmt::Display for WalkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<4}[{:3}] @ {} = {:#018x}",
            self.level, self.index, self.entry_address, self.entry
        )
    }
}

/// The entries visited by a walk, root first (at most four).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WalkPath {
    steps: [WalkStep; 4],
    len: u8,
}

impl WalkPath {
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[WalkStep] {
        &self.steps[..usize::from(self.len)]
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, WalkStep> {
        self.as_slice().iter()
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&WalkStep> {
        self.as_slice().last()
    }

    fn push(&mut self, step: WalkStep) {
        debug_assert!(usize::from(self.len) < self.steps.len());
        self.steps[usize::from(self.len)] = step;
        self.len += 1;
    }
}

impl<'a> IntoIterator for &'a WalkPath {
    type Item = &'a WalkStep;
    type IntoIter = core::slice::Iter<'a, WalkStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A completed translation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Translation {
    virtual_address: VirtualAddress,
    physical_address: PhysicalAddress,
    size: MappingSize,
    path: WalkPath,
}

impl Translation {
    #[inline]
    #[must_use]
    pub const fn virtual_address(&self) -> VirtualAddress {
        self.virtual_address
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.physical_address
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> MappingSize {
        self.size
    }

    /// Physical base of the mapped page (the result with the offset cleared).
    #[inline]
    #[must_use]
    pub const fn page_base(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.physical_address.as_u64() & !self.size.offset_mask())
    }

    /// The raw leaf entry that resolved the translation.
    #[inline]
    #[must_use]
    pub fn leaf_entry(&self) -> u64 {
        self.path.last().map_or(0, |step| step.entry)
    }

    #[inline]
    #[must_use]
    pub const fn path(&self) -> &WalkPath {
        &self.path
    }
}

/// The entry fetched for `level` had its present bit clear.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{level} entry at {entry_address} is not present while translating {virtual_address} (entry {entry:#018x})")]
pub struct NotPresent {
    pub level: LevelKind,
    pub virtual_address: VirtualAddress,
    pub entry_address: PhysicalAddress,
    pub entry: u64,
}

/// Outcome of feeding one entry to a [`Walk`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum Step {
    /// Another entry is needed; see [`Walk::pending`].
    Next(Walk),
    /// The walk terminated with a translation.
    Done(Translation),
}

/// An in-progress translation of one virtual address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Walk {
    va: VirtualAddress,
    level: LevelKind,
    address: PhysicalAddress,
    path: WalkPath,
}

impl Walk {
    /// Start translating `va` in the address space rooted at `root`.
    ///
    /// The first pending read is the PML4 entry for `va`.
    #[must_use]
    pub fn new(root: Cr3, va: VirtualAddress) -> Self {
        Self {
            va,
            level: LevelKind::Pml4,
            address: Pml4::entry_address(root, va),
            path: WalkPath::default(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn virtual_address(&self) -> VirtualAddress {
        self.va
    }

    /// The level and physical address of the entry to fetch next.
    #[inline]
    #[must_use]
    pub const fn pending(&self) -> (LevelKind, PhysicalAddress) {
        (self.level, self.address)
    }

    /// Entries consumed so far.
    #[inline]
    #[must_use]
    pub const fn path(&self) -> &WalkPath {
        &self.path
    }

    /// Feed the value stored at [`pending`](Self::pending).
    ///
    /// # Errors
    /// Returns [`NotPresent`] if the entry's present bit is clear; nothing is
    /// derived from such an entry.
    pub fn advance(mut self, raw: u64) -> Result<Step, NotPresent> {
        self.path.push(WalkStep {
            level: self.level,
            index: self.level.index_of(self.va),
            entry_address: self.address,
            entry: raw,
        });

        match self.level {
            LevelKind::Pml4 => {
                let pml4e = self.present::<Pml4>(raw)?;
                Ok(self.descend::<Pdpt>(pml4e))
            }
            LevelKind::Pdpt => match self.present::<Pdpt>(raw).map(PdptEntry::view)? {
                PdptView::Leaf1G(leaf) => {
                    Ok(self.finish(leaf.large_page_address(self.va), MappingSize::Size1G))
                }
                PdptView::Table(pdpte) => Ok(self.descend::<Pd>(pdpte)),
            },
            LevelKind::Pd => match self.present::<Pd>(raw).map(PdEntry::view)? {
                PdView::Leaf2M(leaf) => {
                    Ok(self.finish(leaf.large_page_address(self.va), MappingSize::Size2M))
                }
                PdView::Table(pde) => Ok(self.descend::<Pt>(pde)),
            },
            LevelKind::Pt => {
                let pte = self.present::<Pt>(raw)?;
                Ok(self.finish(pte.final_address(self.va), MappingSize::Size4K))
            }
        }
    }

    fn present<L: PagingLevel>(&self, raw: u64) -> Result<L::Entry, NotPresent> {
        let entry = L::Entry::from_raw(raw);
        if entry.present() {
            Ok(entry)
        } else {
            Err(NotPresent {
                level: L::KIND,
                virtual_address: self.va,
                entry_address: self.address,
                entry: raw,
            })
        }
    }

    fn descend<L: PagingLevel>(mut self, parent: L::Parent) -> Step {
        self.level = L::KIND;
        self.address = L::entry_address(parent, self.va);
        Step::Next(self)
    }

    const fn finish(self, physical_address: PhysicalAddress, size: MappingSize) -> Step {
        Step::Done(Translation {
            virtual_address: self.va,
            physical_address,
            size,
            path: self.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{PAGE_SIZE_BIT, PRESENT_BIT, WRITABLE_BIT};

    const P: u64 = PRESENT_BIT | WRITABLE_BIT;

    fn expect_next(step: Result<Step, NotPresent>) -> Walk {
        match step {
            Ok(Step::Next(walk)) => walk,
            other => panic!("expected another level, got {other:?}"),
        }
    }

    fn expect_done(step: Result<Step, NotPresent>) -> Translation {
        match step {
            Ok(Step::Done(translation)) => translation,
            other => panic!("expected a translation, got {other:?}"),
        }
    }

    #[test]
    fn four_level_walk_requests_expected_addresses() {
        let va = VirtualAddress::new(0x0000_0000_0040_1000);
        let walk = Walk::new(Cr3::from_bits(0x1000), va);
        assert_eq!(walk.pending(), (LevelKind::Pml4, PhysicalAddress::new(0x1000)));

        let walk = expect_next(walk.advance(0x2000 | P));
        assert_eq!(walk.pending(), (LevelKind::Pdpt, PhysicalAddress::new(0x2000)));

        let walk = expect_next(walk.advance(0x3000 | P));
        assert_eq!(walk.pending(), (LevelKind::Pd, PhysicalAddress::new(0x3010)));

        let walk = expect_next(walk.advance(0x4000 | P));
        assert_eq!(walk.pending(), (LevelKind::Pt, PhysicalAddress::new(0x4008)));

        let t = expect_done(walk.advance(0x9000 | P));
        assert_eq!(t.physical_address(), PhysicalAddress::new(0x9000));
        assert_eq!(t.size(), MappingSize::Size4K);
        assert_eq!(t.path().len(), 4);
        assert_eq!(t.leaf_entry(), 0x9000 | P);
        let indices: Vec<u16> = t.path().iter().map(|s| s.index).collect();
        assert_eq!(indices, [0, 0, 2, 1]);
    }

    #[test]
    fn one_gib_leaf_ends_at_pdpt() {
        let va = VirtualAddress::new(0x4000_0ABC);
        let walk = expect_next(Walk::new(Cr3::from_bits(0x1000), va).advance(0x2000 | P));
        assert_eq!(walk.pending().1, PhysicalAddress::new(0x2008));

        let t = expect_done(walk.advance(0x4000_0000 | PAGE_SIZE_BIT | P));
        assert_eq!(t.physical_address(), PhysicalAddress::new(0x4000_0ABC));
        assert_eq!(t.size(), MappingSize::Size1G);
        assert_eq!(t.page_base(), PhysicalAddress::new(0x4000_0000));
        assert_eq!(t.path().len(), 2);
    }

    #[test]
    fn two_mib_leaf_ends_at_pd() {
        let va = VirtualAddress::new(0x0000_0000_0045_6789);
        let walk = Walk::new(Cr3::from_bits(0x1000), va);
        let walk = expect_next(walk.advance(0x2000 | P));
        let walk = expect_next(walk.advance(0x3000 | P));
        let t = expect_done(walk.advance(0x0180_0000 | PAGE_SIZE_BIT | P));
        assert_eq!(t.physical_address(), PhysicalAddress::new(0x0185_6789));
        assert_eq!(t.size(), MappingSize::Size2M);
        assert_eq!(t.size().leaf_level(), LevelKind::Pd);
    }

    #[test]
    fn not_present_stops_at_every_level() {
        let va = VirtualAddress::new(0x0000_0000_0040_1000);
        let chain = [0x2000 | P, 0x3000 | P, 0x4000 | P, 0x9000 | P];
        for failing in 0..chain.len() {
            let mut walk = Walk::new(Cr3::from_bits(0x1000), va);
            for (level, raw) in chain.iter().enumerate() {
                // Everything but the present bit is kept to show it is not used.
                let raw = if level == failing { raw & !PRESENT_BIT } else { *raw };
                let expected_address = walk.pending().1;
                match walk.advance(raw) {
                    Ok(Step::Next(next)) => walk = next,
                    Ok(Step::Done(t)) => panic!("walk completed despite clear present bit: {t:?}"),
                    Err(e) => {
                        assert_eq!(level, failing);
                        assert_eq!(e.entry_address, expected_address);
                        assert_eq!(e.entry, raw);
                        assert_eq!(e.virtual_address, va);
                        break;
                    }
                }
            }
        }
    }

    #[test]
    fn large_page_flag_ignored_at_root_and_leaf() {
        let va = VirtualAddress::new(0x0000_0000_0040_1000);
        let walk = Walk::new(Cr3::from_bits(0x1000), va);
        // Bit 7 set on a PML4E does not terminate the walk.
        let walk = expect_next(walk.advance(0x2000 | PAGE_SIZE_BIT | P));
        assert_eq!(walk.pending().0, LevelKind::Pdpt);
        let walk = expect_next(walk.advance(0x3000 | P));
        let walk = expect_next(walk.advance(0x4000 | P));
        // Bit 7 on a PTE is PAT; still a 4 KiB translation.
        let t = expect_done(walk.advance(0x9000 | PAGE_SIZE_BIT | P));
        assert_eq!(t.size(), MappingSize::Size4K);
        assert_eq!(t.physical_address(), PhysicalAddress::new(0x9000));
    }

    #[test]
    fn step_display() {
        let step = WalkStep {
            level: LevelKind::Pd,
            index: 2,
            entry_address: PhysicalAddress::new(0x3010),
            entry: 0x4003,
        };
        assert_eq!(
            step.to_string(),
            "PD  [  2] @ 0x0000000000003010 = 0x0000000000004003"
        );
    }
}
