//! # Virtual and Physical Addresses for Page Walks
//!
//! Strongly typed wrappers for the two address kinds a software page walk
//! juggles: the **virtual** address being translated and the **physical**
//! addresses of paging structures and of the final mapping.
//!
//! ## Overview
//!
//! A walker over a *foreign* address space (a guest, a crash dump, a remote
//! target) never dereferences either kind of address itself; it only computes
//! them. Mixing them up is the classic bug, so every value carries its kind:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address of unspecified kind. |
//! | [`VirtualAddress`] | An address in the translated (virtual) space. |
//! | [`PhysicalAddress`] | An address in physical memory, as read by the memory collaborator. |
//! | [`MemoryPage<S>`] / [`PhysicalPage<S>`] | A base address aligned to page size `S`. |
//! | [`MemoryAddressOffset<S>`] | The byte offset within a page of size `S`. |
//!
//! ## Page Sizes
//!
//! The three x86-64 translation granules are marker types implementing the
//! sealed [`PageSize`] trait:
//!
//! - [`Size4K`]: 4 KiB pages, resolved by a leaf page-table entry
//! - [`Size2M`]: 2 MiB pages, resolved by a page-directory entry with `PS=1`
//! - [`Size1G`]: 1 GiB pages, resolved by a PDPT entry with `PS=1`
//!
//! ## Typical Usage
//!
//! ```rust
//! # use paging_addresses::*;
//! let va = VirtualAddress::new(0x0000_7FFF_1234_5678);
//! let (page, offset) = va.split::<Size2M>();
//! assert_eq!(page.base().as_u64(), 0x0000_7FFF_1220_0000);
//! assert_eq!(offset.as_u64(), 0x0014_5678);
//!
//! // A large-page frame joined with the in-page offset of the VA.
//! let frame = PhysicalPage::<Size2M>::from_addr(PhysicalAddress::new(0x8_0000_0000));
//! assert_eq!(frame.join(offset).as_u64(), 0x8_0014_5678);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod memory_address;
mod memory_address_offset;
mod memory_page;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use crate::memory_address::MemoryAddress;
pub use crate::memory_address_offset::MemoryAddressOffset;
pub use crate::memory_page::MemoryPage;
pub use crate::page_size::{PageSize, Size1G, Size2M, Size4K};
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;
pub use crate::virtual_address::VirtualAddress;
