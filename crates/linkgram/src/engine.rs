//! The engine ABI surface this crate consumes.
//!
//! `Engine` mirrors the link-grammar C functions one-to-one. `NativeEngine`
//! implements it over a dynamically loaded library; the rest of the crate
//! only talks to the trait, so the handle guards and builders never care
//! where the engine came from.
//!
//! # Safety contract
//!
//! Every `unsafe` method takes handles that must have been returned by the
//! same engine and not yet released. Returned strings and node pointers are
//! owned by the engine and stay valid only until the handle they were read
//! from is released (or, for strings, until the next call on that handle).

use crate::ffi::{CNode, DictionaryRaw, LinkageRaw, ParseOptionsRaw, SentenceRaw};
use std::ffi::{CStr, c_char, c_int};

/// Parse option setters applied to an options handle at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOption {
    Verbosity,
    LinkageLimit,
    /// Seconds before the engine gives up on a sentence.
    MaxParseTime,
    MinNullCount,
    MaxNullCount,
}

impl ParseOption {
    /// C symbol of the setter.
    pub fn setter_symbol(self) -> &'static str {
        match self {
            ParseOption::Verbosity => "parse_options_set_verbosity",
            ParseOption::LinkageLimit => "parse_options_set_linkage_limit",
            ParseOption::MaxParseTime => "parse_options_set_max_parse_time",
            ParseOption::MinNullCount => "parse_options_set_min_null_count",
            ParseOption::MaxNullCount => "parse_options_set_max_null_count",
        }
    }
}

pub trait Engine: Send + Sync {
    fn parse_options_create(&self) -> *mut ParseOptionsRaw;
    unsafe fn parse_options_delete(&self, opts: *mut ParseOptionsRaw);
    unsafe fn parse_options_set(
        &self,
        opts: *mut ParseOptionsRaw,
        option: ParseOption,
        value: c_int,
    );

    /// Returns null when any of the files cannot be read or parsed.
    unsafe fn dictionary_create(
        &self,
        dict: &CStr,
        post_process: &CStr,
        constituent: &CStr,
        affix: &CStr,
    ) -> *mut DictionaryRaw;
    unsafe fn dictionary_delete(&self, dict: *mut DictionaryRaw);

    unsafe fn sentence_create(&self, text: &CStr, dict: *mut DictionaryRaw) -> *mut SentenceRaw;
    unsafe fn sentence_delete(&self, sent: *mut SentenceRaw);
    /// Number of valid linkages, or a negative status on failure.
    unsafe fn sentence_parse(&self, sent: *mut SentenceRaw, opts: *mut ParseOptionsRaw) -> c_int;
    /// Words the last parse had to skip to find any linkage.
    unsafe fn sentence_null_count(&self, sent: *mut SentenceRaw) -> c_int;

    unsafe fn linkage_create(
        &self,
        index: c_int,
        sent: *mut SentenceRaw,
        opts: *mut ParseOptionsRaw,
    ) -> *mut LinkageRaw;
    unsafe fn linkage_delete(&self, linkage: *mut LinkageRaw);

    /// Root of a freshly allocated constituent tree, or null.
    unsafe fn linkage_constituent_tree(&self, linkage: *mut LinkageRaw) -> *mut CNode;
    /// Releases a tree from `linkage_constituent_tree`. Returns `false` when
    /// the engine build has no release function, in which case the tree
    /// stays with the engine.
    unsafe fn linkage_free_constituent_tree(&self, root: *mut CNode) -> bool;

    unsafe fn linkage_get_num_words(&self, linkage: *mut LinkageRaw) -> c_int;
    unsafe fn linkage_get_num_links(&self, linkage: *mut LinkageRaw) -> c_int;
    unsafe fn linkage_get_link_label(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char;
    unsafe fn linkage_get_link_llabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char;
    unsafe fn linkage_get_link_rlabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char;
    unsafe fn linkage_get_link_lword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    unsafe fn linkage_get_link_rword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    /// Number of words the link spans.
    unsafe fn linkage_get_link_length(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    unsafe fn linkage_get_word(&self, linkage: *mut LinkageRaw, word: c_int) -> *const c_char;
    unsafe fn linkage_link_cost(&self, linkage: *mut LinkageRaw) -> c_int;

    /// ASCII diagram of the linkage. `None` when the engine build does not
    /// export a diagram printer. Builds whose printer takes no layout
    /// arguments ignore `display_walls` and `screen_width`.
    unsafe fn linkage_print_diagram(
        &self,
        linkage: *mut LinkageRaw,
        display_walls: bool,
        screen_width: usize,
    ) -> Option<*mut c_char>;
    /// Releases a string from `linkage_print_diagram`. Returns `false` when
    /// no release function is available.
    unsafe fn linkage_free_diagram(&self, diagram: *mut c_char) -> bool;
}
