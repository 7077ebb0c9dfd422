//! Heap management for the Petrel engine.
//!
//! One [`Heap`] owns every garbage-collected resource of one engine
//! instance: the object, function and property arenas, the relocatable
//! owned-string buffer, the foreign-string table, and the regular
//! expression table. The collector is a mark-sweep pass over the arenas
//! with string compaction by re-emission; see [`Heap::collect`].
//!
//! The object-model primitives here are the ones that can never run user
//! code: own-property lookup, tail insertion, unlinking, enumeration and
//! the dense-array element contract. Everything that may invoke a getter
//! or setter lives in the `vm` crate, which composes these primitives.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod gc;
mod heap;
mod object;
mod regexp;
mod strings;

pub use gc::StrRemap;
pub use heap::{Heap, HeapOptions};
pub use object::{FuncData, ObjData, Prop, PropData, PropList};
pub use regexp::{RegexpData, RegexpFlags};
pub use strings::dict;
