//! # Software Page Walks for x86-64
//!
//! Manual virtual → physical address translation for 4-level x86-64 paging,
//! computed from raw paging-structure entries instead of the CPU's MMU.
//! Hypervisors, VM-introspection and memory-forensics tools use this to
//! translate addresses of a *foreign* address space by reading its physical
//! memory.
//!
//! ## What you get
//! - Typed paging [`levels`](level) with per-level index extraction and
//!   entry-address arithmetic ([`PagingLevel`], [`TableIndex`]).
//! - [`bitfield`](bitfield_struct) decoders for every entry form: [`Cr3`],
//!   [`Pml4e`], [`Pdpte`] / [`Pdpte1G`], [`Pde`] / [`Pde2M`], [`Pte`].
//! - A pure, resumable [`Walk`] state machine for callers that fetch entries
//!   themselves.
//! - A [`PageWalker`] that drives the walk through a [`PhysicalMemory`] reader.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! Each index selects one of 512 eight-byte entries in its level's table:
//!
//! ```text
//!  CR3 → PML4E → PDPTE → PDE → PTE → 4 KiB page   (offset = VA[11:0])
//!                  │       └── PS=1 → 2 MiB page  (offset = VA[20:0])
//!                  └────────── PS=1 → 1 GiB page  (offset = VA[29:0])
//! ```
//!
//! Every step is the same three operations:
//!
//! 1. **Index**: `(va >> shift) & 0x1FF` with shift 39 / 30 / 21 / 12.
//! 2. **Table base**: `parent & 0x000F_FFFF_FFFF_F000` (bits 51:12 of the
//!    parent entry or of CR3).
//! 3. **Entry address**: `table_base | (index * 8)`.
//!
//! The multiplication by the entry size belongs to step 3 only; a
//! [`TableIndex`] is always the plain `0..512` slot number.
//!
//! ## Presence
//!
//! A clear present bit at any level ends the walk with [`NotPresent`]. The
//! address arithmetic itself never looks at the present bit; [`Walk`] checks
//! it after every fetch before decoding the entry any further.
//!
//! ## Example
//!
//! ```rust
//! use paging_addresses::{PhysicalAddress, VirtualAddress};
//! use paging_walk::{Cr3, MappingSize, Step, Walk};
//!
//! // A tiny hand-built hierarchy: PML4 @ 0x1000 → PDPT @ 0x2000 → PD @ 0x3000 → PT @ 0x4000.
//! let memory = [(0x1000, 0x2003), (0x2000, 0x3003), (0x3010, 0x4003), (0x4008, 0x9003)];
//! let read = |pa: PhysicalAddress| {
//!     memory.iter().find(|(a, _)| *a == pa.as_u64()).map_or(0, |(_, v)| *v)
//! };
//!
//! let mut walk = Walk::new(Cr3::from_bits(0x1000), VirtualAddress::new(0x0040_1000));
//! let translation = loop {
//!     let (_, address) = walk.pending();
//!     match walk.advance(read(address)).unwrap() {
//!         Step::Next(next) => walk = next,
//!         Step::Done(t) => break t,
//!     }
//! };
//!
//! assert_eq!(translation.physical_address(), PhysicalAddress::new(0x9000));
//! assert_eq!(translation.size(), MappingSize::Size4K);
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(clippy::inline_always)]

pub mod bits;
mod cr3;
pub mod level;
pub mod page_table;
mod walk;
mod walker;

pub use crate::cr3::Cr3;
pub use crate::level::{LevelKind, PagingLevel, Pd, Pdpt, Pml4, Pt, TableIndex, split_indices};
pub use crate::page_table::pd::{Pde, Pde2M, PdEntry, PdView};
pub use crate::page_table::pdpt::{Pdpte, Pdpte1G, PdptEntry, PdptView};
pub use crate::page_table::pml4::Pml4e;
pub use crate::page_table::pt::Pte;
pub use crate::page_table::{PageEntry, TableReference};
pub use crate::walk::{MappingSize, NotPresent, Step, Translation, Walk, WalkPath, WalkStep};
pub use crate::walker::{PageWalker, PhysicalMemory, WalkError};
