//! Raw shapes of the link-grammar C API.
//!
//! Handle types are opaque: the engine allocates them and only ever hands out
//! pointers. `CNode` is the one record this crate reads field-by-field.

use std::ffi::{c_char, c_int};
use std::marker::{PhantomData, PhantomPinned};

macro_rules! opaque {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: PhantomData<(*mut u8, PhantomPinned)>,
            }
        )*
    };
}

opaque! {
    /// `struct Parse_Options_s`.
    ParseOptionsRaw;
    /// `struct Dictionary_s`.
    DictionaryRaw;
    /// `struct Sentence_s`.
    SentenceRaw;
    /// `struct Linkage_s`.
    LinkageRaw;
}

/// Constituent tree node as laid out by the engine (`CNode`).
///
/// A node's children are reached by following `next` from `child`. Leaves
/// have a null `child`.
#[repr(C)]
pub struct CNode {
    pub label: *mut c_char,
    pub child: *mut CNode,
    pub next: *mut CNode,
    pub start: c_int,
    pub end: c_int,
}
