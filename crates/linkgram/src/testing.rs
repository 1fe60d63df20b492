//! Scripted in-process engine for unit tests.
//!
//! Handles are real heap allocations behind the same opaque pointer types the
//! native library uses, and constituent trees are genuine `CNode` chains, so
//! the guards and builders run exactly the pointer-walking code they run
//! against the shared library. Every allocation is counted so tests can
//! assert that each handle is released exactly once.

use crate::engine::{Engine, ParseOption};
use crate::ffi::{CNode, DictionaryRaw, LinkageRaw, ParseOptionsRaw, SentenceRaw};
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Owned description of a constituent tree.
#[derive(Debug, Clone)]
pub(crate) struct TreeSpec {
    pub label: String,
    pub start: i32,
    pub end: i32,
    pub children: Vec<TreeSpec>,
}

impl TreeSpec {
    pub fn node(label: &str, start: i32, end: i32, children: Vec<TreeSpec>) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
            children,
        }
    }

    pub fn leaf(label: &str, position: i32) -> Self {
        Self::node(label, position, position, Vec::new())
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeSpec::count).sum::<usize>()
    }
}

/// Allocate a `CNode` structure shaped like `spec`.
pub(crate) fn build_cnodes(spec: &TreeSpec) -> *mut CNode {
    let mut first_child: *mut CNode = ptr::null_mut();
    for child in spec.children.iter().rev() {
        let node = build_cnodes(child);
        // SAFETY: `node` was just allocated above.
        unsafe { (*node).next = first_child };
        first_child = node;
    }
    Box::into_raw(Box::new(CNode {
        label: CString::new(spec.label.as_str()).unwrap().into_raw(),
        child: first_child,
        next: ptr::null_mut(),
        start: spec.start,
        end: spec.end,
    }))
}

/// Free a structure from [`build_cnodes`], siblings of `root` included.
pub(crate) unsafe fn free_cnodes(root: *mut CNode) {
    let mut stack = vec![root];
    while let Some(ptr) = stack.pop() {
        if ptr.is_null() {
            continue;
        }
        // SAFETY: every pointer here came from `Box::into_raw` in `build_cnodes`.
        let node = unsafe { Box::from_raw(ptr) };
        stack.push(node.child);
        stack.push(node.next);
        if !node.label.is_null() {
            drop(unsafe { CString::from_raw(node.label) });
        }
    }
}

/// Create/release counts for one handle kind.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    created: AtomicUsize,
    released: AtomicUsize,
}

impl Ledger {
    fn create(&self) {
        self.created.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.created() - self.released()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeLink {
    label: String,
    left_label: String,
    right_label: String,
    left_word: i32,
    right_word: i32,
}

/// One linkage the fake engine reports for a sentence.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeParse {
    words: Vec<String>,
    links: Vec<FakeLink>,
    tree: Option<TreeSpec>,
    cost: i32,
}

impl FakeParse {
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn link(mut self, label: &str, left: (&str, i32), right: (&str, i32)) -> Self {
        self.links.push(FakeLink {
            label: label.to_string(),
            left_label: left.0.to_string(),
            right_label: right.0.to_string(),
            left_word: left.1,
            right_word: right.1,
        });
        self
    }

    pub fn tree(mut self, tree: TreeSpec) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn cost(mut self, cost: i32) -> Self {
        self.cost = cost;
        self
    }
}

#[derive(Debug, Clone)]
enum Script {
    Parses { parses: Vec<FakeParse>, null_count: i32 },
    Status(i32),
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    scripts: HashMap<String, Script>,
    fail_options: bool,
    fail_dictionary: bool,
    fail_sentences: bool,
    fail_linkages: bool,
    no_tree_release: bool,
    no_diagram: bool,
    pub options: Ledger,
    pub dictionaries: Ledger,
    pub sentences: Ledger,
    pub linkages: Ledger,
    pub trees: Ledger,
    pub diagrams: Ledger,
    pub settings: Mutex<Vec<(ParseOption, i32)>>,
    pub dictionary_paths: Mutex<Vec<String>>,
    /// `(display_walls, screen_width)` of every diagram request.
    pub diagram_layouts: Mutex<Vec<(bool, usize)>>,
}

impl FakeState {
    /// Handles and allocations not yet released, across all kinds.
    pub fn live_handles(&self) -> usize {
        self.options.live()
            + self.dictionaries.live()
            + self.sentences.live()
            + self.linkages.live()
            + self.trees.live()
            + self.diagrams.live()
    }
}

/// Cloning shares the script and the ledgers.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeEngine {
    state: Arc<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut FakeState {
        Arc::get_mut(&mut self.state).expect("configure the fake before sharing it")
    }

    pub fn sentence(self, text: &str, parses: Vec<FakeParse>) -> Self {
        self.sentence_with_nulls(text, 0, parses)
    }

    /// Like [`sentence`](Self::sentence), found only after skipping
    /// `null_count` words.
    pub fn sentence_with_nulls(
        mut self,
        text: &str,
        null_count: i32,
        parses: Vec<FakeParse>,
    ) -> Self {
        self.state_mut()
            .scripts
            .insert(text.to_string(), Script::Parses { parses, null_count });
        self
    }

    pub fn parse_status(mut self, text: &str, status: i32) -> Self {
        self.state_mut()
            .scripts
            .insert(text.to_string(), Script::Status(status));
        self
    }

    pub fn failing_options(mut self) -> Self {
        self.state_mut().fail_options = true;
        self
    }

    pub fn failing_dictionary(mut self) -> Self {
        self.state_mut().fail_dictionary = true;
        self
    }

    /// `sentence_create` returns null.
    pub fn failing_sentences(mut self) -> Self {
        self.state_mut().fail_sentences = true;
        self
    }

    /// `linkage_create` returns null even for indices below the count.
    pub fn failing_linkages(mut self) -> Self {
        self.state_mut().fail_linkages = true;
        self
    }

    pub fn without_tree_release(mut self) -> Self {
        self.state_mut().no_tree_release = true;
        self
    }

    pub fn without_diagram(mut self) -> Self {
        self.state_mut().no_diagram = true;
        self
    }

    pub fn state(&self) -> &FakeState {
        &self.state
    }
}

struct FakeSentence {
    text: String,
    parses: Vec<FakeParse>,
    null_count: i32,
}

struct FakeLinkage {
    index: usize,
    words: Vec<CString>,
    links: Vec<[CString; 3]>,
    ends: Vec<(i32, i32)>,
    tree: Option<TreeSpec>,
    cost: i32,
    sentence: String,
}

unsafe fn linkage_ref<'a>(linkage: *mut LinkageRaw) -> &'a FakeLinkage {
    unsafe { &*(linkage as *const FakeLinkage) }
}

fn link_field(linkage: &FakeLinkage, index: c_int, field: usize) -> *const c_char {
    usize::try_from(index)
        .ok()
        .and_then(|i| linkage.links.get(i))
        .map_or(ptr::null(), |strings| strings[field].as_ptr())
}

fn link_ends(linkage: &FakeLinkage, index: c_int) -> Option<(i32, i32)> {
    usize::try_from(index)
        .ok()
        .and_then(|i| linkage.ends.get(i))
        .copied()
}

impl Engine for FakeEngine {
    fn parse_options_create(&self) -> *mut ParseOptionsRaw {
        if self.state.fail_options {
            return ptr::null_mut();
        }
        self.state.options.create();
        Box::into_raw(Box::new(0u8)) as *mut ParseOptionsRaw
    }

    unsafe fn parse_options_delete(&self, opts: *mut ParseOptionsRaw) {
        self.state.options.release();
        drop(unsafe { Box::from_raw(opts as *mut u8) });
    }

    unsafe fn parse_options_set(
        &self,
        _opts: *mut ParseOptionsRaw,
        option: ParseOption,
        value: c_int,
    ) {
        self.state.settings.lock().unwrap().push((option, value));
    }

    unsafe fn dictionary_create(
        &self,
        dict: &CStr,
        post_process: &CStr,
        constituent: &CStr,
        affix: &CStr,
    ) -> *mut DictionaryRaw {
        let mut paths = self.state.dictionary_paths.lock().unwrap();
        for p in [dict, post_process, constituent, affix] {
            paths.push(p.to_string_lossy().into_owned());
        }
        if self.state.fail_dictionary {
            return ptr::null_mut();
        }
        self.state.dictionaries.create();
        Box::into_raw(Box::new(0u8)) as *mut DictionaryRaw
    }

    unsafe fn dictionary_delete(&self, dict: *mut DictionaryRaw) {
        self.state.dictionaries.release();
        drop(unsafe { Box::from_raw(dict as *mut u8) });
    }

    unsafe fn sentence_create(&self, text: &CStr, _dict: *mut DictionaryRaw) -> *mut SentenceRaw {
        if self.state.fail_sentences {
            return ptr::null_mut();
        }
        self.state.sentences.create();
        let text = text.to_string_lossy().into_owned();
        Box::into_raw(Box::new(FakeSentence {
            text,
            parses: Vec::new(),
            null_count: 0,
        })) as *mut SentenceRaw
    }

    unsafe fn sentence_delete(&self, sent: *mut SentenceRaw) {
        self.state.sentences.release();
        drop(unsafe { Box::from_raw(sent as *mut FakeSentence) });
    }

    unsafe fn sentence_parse(&self, sent: *mut SentenceRaw, _opts: *mut ParseOptionsRaw) -> c_int {
        let sentence = unsafe { &mut *(sent as *mut FakeSentence) };
        match self.state.scripts.get(&sentence.text) {
            Some(Script::Parses { parses, null_count }) => {
                sentence.parses = parses.clone();
                sentence.null_count = *null_count;
                parses.len() as c_int
            }
            Some(Script::Status(status)) => *status,
            None => 0,
        }
    }

    unsafe fn sentence_null_count(&self, sent: *mut SentenceRaw) -> c_int {
        unsafe { &*(sent as *const FakeSentence) }.null_count
    }

    unsafe fn linkage_create(
        &self,
        index: c_int,
        sent: *mut SentenceRaw,
        _opts: *mut ParseOptionsRaw,
    ) -> *mut LinkageRaw {
        let sentence = unsafe { &*(sent as *const FakeSentence) };
        let Some(parse) = usize::try_from(index).ok().and_then(|i| sentence.parses.get(i)) else {
            return ptr::null_mut();
        };
        if self.state.fail_linkages {
            return ptr::null_mut();
        }
        self.state.linkages.create();
        let c = |s: &str| CString::new(s).unwrap();
        Box::into_raw(Box::new(FakeLinkage {
            index: index as usize,
            words: parse.words.iter().map(|w| c(w)).collect(),
            links: parse
                .links
                .iter()
                .map(|l| [c(&l.label), c(&l.left_label), c(&l.right_label)])
                .collect(),
            ends: parse.links.iter().map(|l| (l.left_word, l.right_word)).collect(),
            tree: parse.tree.clone(),
            cost: parse.cost,
            sentence: sentence.text.clone(),
        })) as *mut LinkageRaw
    }

    unsafe fn linkage_delete(&self, linkage: *mut LinkageRaw) {
        self.state.linkages.release();
        drop(unsafe { Box::from_raw(linkage as *mut FakeLinkage) });
    }

    unsafe fn linkage_constituent_tree(&self, linkage: *mut LinkageRaw) -> *mut CNode {
        let linkage = unsafe { linkage_ref(linkage) };
        match &linkage.tree {
            Some(spec) => {
                self.state.trees.create();
                build_cnodes(spec)
            }
            None => ptr::null_mut(),
        }
    }

    unsafe fn linkage_free_constituent_tree(&self, root: *mut CNode) -> bool {
        self.state.trees.release();
        // Without a release function the engine keeps (and here, frees) it.
        unsafe { free_cnodes(root) };
        !self.state.no_tree_release
    }

    unsafe fn linkage_get_num_words(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { linkage_ref(linkage) }.words.len() as c_int
    }

    unsafe fn linkage_get_num_links(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { linkage_ref(linkage) }.links.len() as c_int
    }

    unsafe fn linkage_get_link_label(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        link_field(unsafe { linkage_ref(linkage) }, index, 0)
    }

    unsafe fn linkage_get_link_llabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        link_field(unsafe { linkage_ref(linkage) }, index, 1)
    }

    unsafe fn linkage_get_link_rlabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        link_field(unsafe { linkage_ref(linkage) }, index, 2)
    }

    unsafe fn linkage_get_link_lword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        link_ends(unsafe { linkage_ref(linkage) }, index).map_or(-1, |(l, _)| l)
    }

    unsafe fn linkage_get_link_rword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        link_ends(unsafe { linkage_ref(linkage) }, index).map_or(-1, |(_, r)| r)
    }

    unsafe fn linkage_get_link_length(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        link_ends(unsafe { linkage_ref(linkage) }, index).map_or(-1, |(l, r)| r - l)
    }

    unsafe fn linkage_get_word(&self, linkage: *mut LinkageRaw, word: c_int) -> *const c_char {
        let linkage = unsafe { linkage_ref(linkage) };
        usize::try_from(word)
            .ok()
            .and_then(|w| linkage.words.get(w))
            .map_or(ptr::null(), |w| w.as_ptr())
    }

    unsafe fn linkage_link_cost(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { linkage_ref(linkage) }.cost
    }

    unsafe fn linkage_print_diagram(
        &self,
        linkage: *mut LinkageRaw,
        display_walls: bool,
        screen_width: usize,
    ) -> Option<*mut c_char> {
        if self.state.no_diagram {
            return None;
        }
        self.state
            .diagram_layouts
            .lock()
            .unwrap()
            .push((display_walls, screen_width));
        let linkage = unsafe { linkage_ref(linkage) };
        self.state.diagrams.create();
        let text = format!("diagram {} of \"{}\"\n", linkage.index, linkage.sentence);
        Some(CString::new(text).unwrap().into_raw())
    }

    unsafe fn linkage_free_diagram(&self, diagram: *mut c_char) -> bool {
        self.state.diagrams.release();
        drop(unsafe { CString::from_raw(diagram) });
        true
    }
}
