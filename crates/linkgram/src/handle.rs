//! Owned guards for engine handles.
//!
//! Each handle kind gets one type with one release path (`Drop`). Session
//! handles (options, dictionary) hold the engine by `Arc`; request handles
//! (sentence, linkage, constituent tree) borrow their parent, so the borrow
//! checker rules out a linkage outliving its sentence or a tree outliving its
//! linkage.

use crate::config::{DictionaryPaths, ParseOptionsConfig};
use crate::engine::{Engine, ParseOption};
use crate::error::{Error, Result};
use crate::ffi::{CNode, DictionaryRaw, LinkageRaw, ParseOptionsRaw, SentenceRaw};
use std::ffi::{CStr, CString, c_char, c_int};
use std::marker::PhantomData;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Copy an engine-owned C string. `call` names the engine function for the
/// error message when the pointer is null.
pub(crate) fn copy_c_str(ptr: *const c_char, call: &str) -> Result<String> {
    if ptr.is_null() {
        return Err(Error::contract(format!("{call} returned a null string")));
    }
    // SAFETY: non-null and, per the engine contract, NUL-terminated and valid
    // until the next call on the owning handle. We copy before returning.
    let s = unsafe { CStr::from_ptr(ptr) };
    Ok(s.to_string_lossy().into_owned())
}

/// Diagram layout: walls hidden, lines wrapped at 180 columns.
const DIAGRAM_DISPLAY_WALLS: bool = false;
const DIAGRAM_SCREEN_WIDTH: usize = 180;

fn to_c_int(index: usize, what: &str) -> Result<c_int> {
    c_int::try_from(index).map_err(|_| Error::contract(format!("{what} {index} out of range")))
}

fn from_c_int(value: c_int, call: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::contract(format!("{call} returned {value}")))
}

fn path_c_string(path: &Path) -> Result<CString> {
    let text = path.to_str().ok_or_else(|| {
        Error::Initialization(format!("path {} is not valid UTF-8", path.display()))
    })?;
    CString::new(text).map_err(|_| {
        Error::Initialization(format!("path {} contains a NUL byte", path.display()))
    })
}

/// Parse options handle, owned for a session's lifetime.
pub(crate) struct Options<E: Engine> {
    engine: Arc<E>,
    raw: NonNull<ParseOptionsRaw>,
}

// SAFETY: the raw handle is only used by the session that owns it, and the
// session serializes every use behind its mutex.
unsafe impl<E: Engine> Send for Options<E> {}

impl<E: Engine> Options<E> {
    pub(crate) fn create(engine: Arc<E>) -> Result<Self> {
        let raw = NonNull::new(engine.parse_options_create()).ok_or_else(|| {
            Error::Initialization("parse_options_create returned null".to_string())
        })?;
        Ok(Self { engine, raw })
    }

    pub(crate) fn set(&self, option: ParseOption, value: i32) {
        debug!(option = option.setter_symbol(), value, "setting parse option");
        // SAFETY: `raw` is a live options handle from `self.engine`.
        unsafe { self.engine.parse_options_set(self.raw.as_ptr(), option, value) }
    }

    pub(crate) fn apply(&self, config: &ParseOptionsConfig) {
        for (option, value) in config.settings() {
            self.set(option, value);
        }
    }

    fn as_ptr(&self) -> *mut ParseOptionsRaw {
        self.raw.as_ptr()
    }
}

impl<E: Engine> Drop for Options<E> {
    fn drop(&mut self) {
        trace!("releasing parse options");
        // SAFETY: created by `self.engine`, released exactly once here.
        unsafe { self.engine.parse_options_delete(self.raw.as_ptr()) }
    }
}

/// Dictionary handle, owned for a session's lifetime.
pub(crate) struct Dictionary<E: Engine> {
    engine: Arc<E>,
    raw: NonNull<DictionaryRaw>,
}

// SAFETY: see `Options`.
unsafe impl<E: Engine> Send for Dictionary<E> {}

impl<E: Engine> Dictionary<E> {
    pub(crate) fn create(engine: Arc<E>, paths: &DictionaryPaths<'_>) -> Result<Self> {
        let dict = path_c_string(paths.dictionary)?;
        let post_process = path_c_string(paths.post_process)?;
        let constituent = path_c_string(paths.constituent)?;
        let affix = path_c_string(paths.affix)?;

        // SAFETY: all arguments are valid C strings for the duration of the call.
        let raw = unsafe { engine.dictionary_create(&dict, &post_process, &constituent, &affix) };
        let raw = NonNull::new(raw).ok_or_else(|| {
            Error::Initialization(format!(
                "could not open dictionary {}",
                paths.dictionary.display()
            ))
        })?;
        Ok(Self { engine, raw })
    }
}

impl<E: Engine> Drop for Dictionary<E> {
    fn drop(&mut self) {
        trace!("releasing dictionary");
        // SAFETY: created by `self.engine`, released exactly once here.
        unsafe { self.engine.dictionary_delete(self.raw.as_ptr()) }
    }
}

/// Sentence handle for one request.
pub(crate) struct Sentence<'d, E: Engine> {
    engine: &'d E,
    raw: NonNull<SentenceRaw>,
    _dictionary: PhantomData<&'d Dictionary<E>>,
}

impl<'d, E: Engine> Sentence<'d, E> {
    pub(crate) fn create(dictionary: &'d Dictionary<E>, text: &str) -> Result<Self> {
        let text = CString::new(text).map_err(|_| Error::InvalidText)?;
        let engine: &'d E = &dictionary.engine;
        // SAFETY: the dictionary handle is live for 'd; the engine copies the text.
        let raw = unsafe { engine.sentence_create(&text, dictionary.raw.as_ptr()) };
        let raw =
            NonNull::new(raw).ok_or_else(|| Error::contract("sentence_create returned null"))?;
        Ok(Self {
            engine,
            raw,
            _dictionary: PhantomData,
        })
    }

    /// Run the parse and return the number of valid linkages.
    pub(crate) fn parse(&self, options: &Options<E>) -> Result<usize> {
        // SAFETY: both handles are live and belong to the same engine.
        let count = unsafe { self.engine.sentence_parse(self.raw.as_ptr(), options.as_ptr()) };
        if count < 0 {
            return Err(Error::ParseFailed(count));
        }
        debug!(linkages = count, "sentence parsed");
        from_c_int(count, "sentence_parse")
    }

    /// Words skipped by the last [`parse`](Self::parse).
    pub(crate) fn null_count(&self) -> Result<usize> {
        // SAFETY: live sentence handle.
        let n = unsafe { self.engine.sentence_null_count(self.raw.as_ptr()) };
        from_c_int(n, "sentence_null_count")
    }
}

impl<E: Engine> Drop for Sentence<'_, E> {
    fn drop(&mut self) {
        trace!("releasing sentence");
        // SAFETY: created by `self.engine`; every linkage borrowing this
        // sentence has already been dropped.
        unsafe { self.engine.sentence_delete(self.raw.as_ptr()) }
    }
}

/// Linkage handle for one index of a parsed sentence.
pub(crate) struct Linkage<'s, E: Engine> {
    engine: &'s E,
    raw: NonNull<LinkageRaw>,
    index: usize,
    _sentence: PhantomData<&'s SentenceRaw>,
}

impl<'s, E: Engine> Linkage<'s, E> {
    /// `index` must be below the count returned by [`Sentence::parse`].
    pub(crate) fn create(
        sentence: &'s Sentence<'_, E>,
        options: &Options<E>,
        index: usize,
    ) -> Result<Self> {
        let engine: &'s E = sentence.engine;
        let c_index = to_c_int(index, "linkage index")?;
        // SAFETY: handles are live; the caller keeps `index` in range.
        let raw =
            unsafe { engine.linkage_create(c_index, sentence.raw.as_ptr(), options.as_ptr()) };
        let raw = NonNull::new(raw)
            .ok_or_else(|| Error::contract(format!("linkage_create({index}) returned null")))?;
        Ok(Self {
            engine,
            raw,
            index,
            _sentence: PhantomData,
        })
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn num_words(&self) -> Result<usize> {
        // SAFETY: live linkage handle.
        let n = unsafe { self.engine.linkage_get_num_words(self.raw.as_ptr()) };
        from_c_int(n, "linkage_get_num_words")
    }

    pub(crate) fn num_links(&self) -> Result<usize> {
        // SAFETY: live linkage handle.
        let n = unsafe { self.engine.linkage_get_num_links(self.raw.as_ptr()) };
        from_c_int(n, "linkage_get_num_links")
    }

    pub(crate) fn link_label(&self, link: usize) -> Result<String> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: live linkage handle, `i` below `num_links`.
        let ptr = unsafe { self.engine.linkage_get_link_label(self.raw.as_ptr(), i) };
        copy_c_str(ptr, "linkage_get_link_label")
    }

    pub(crate) fn link_left_label(&self, link: usize) -> Result<String> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: as above.
        let ptr = unsafe { self.engine.linkage_get_link_llabel(self.raw.as_ptr(), i) };
        copy_c_str(ptr, "linkage_get_link_llabel")
    }

    pub(crate) fn link_right_label(&self, link: usize) -> Result<String> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: as above.
        let ptr = unsafe { self.engine.linkage_get_link_rlabel(self.raw.as_ptr(), i) };
        copy_c_str(ptr, "linkage_get_link_rlabel")
    }

    pub(crate) fn link_left_word(&self, link: usize) -> Result<usize> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: as above.
        let w = unsafe { self.engine.linkage_get_link_lword(self.raw.as_ptr(), i) };
        from_c_int(w, "linkage_get_link_lword")
    }

    pub(crate) fn link_right_word(&self, link: usize) -> Result<usize> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: as above.
        let w = unsafe { self.engine.linkage_get_link_rword(self.raw.as_ptr(), i) };
        from_c_int(w, "linkage_get_link_rword")
    }

    pub(crate) fn link_length(&self, link: usize) -> Result<usize> {
        let i = to_c_int(link, "link index")?;
        // SAFETY: as above.
        let n = unsafe { self.engine.linkage_get_link_length(self.raw.as_ptr(), i) };
        from_c_int(n, "linkage_get_link_length")
    }

    pub(crate) fn link_cost(&self) -> i32 {
        // SAFETY: live linkage handle.
        unsafe { self.engine.linkage_link_cost(self.raw.as_ptr()) }
    }

    pub(crate) fn word(&self, word: usize) -> Result<String> {
        let w = to_c_int(word, "word index")?;
        // SAFETY: live linkage handle, `w` below `num_words`.
        let ptr = unsafe { self.engine.linkage_get_word(self.raw.as_ptr(), w) };
        copy_c_str(ptr, "linkage_get_word")
    }

    pub(crate) fn constituent_tree(&self) -> Result<ConstituentTree<'_, E>> {
        // SAFETY: live linkage handle.
        let root = unsafe { self.engine.linkage_constituent_tree(self.raw.as_ptr()) };
        let root = NonNull::new(root).ok_or_else(|| {
            Error::contract(format!(
                "linkage_constituent_tree returned null for linkage {}",
                self.index
            ))
        })?;
        Ok(ConstituentTree {
            engine: self.engine,
            root,
            _linkage: PhantomData,
        })
    }

    pub(crate) fn diagram(&self) -> Result<String> {
        // SAFETY: live linkage handle.
        let raw = unsafe {
            self.engine.linkage_print_diagram(
                self.raw.as_ptr(),
                DIAGRAM_DISPLAY_WALLS,
                DIAGRAM_SCREEN_WIDTH,
            )
        }
        .ok_or(Error::Unsupported("linkage_print_diagram"))?;
        let copied = copy_c_str(raw, "linkage_print_diagram");
        // SAFETY: `raw` came from `linkage_print_diagram` and is released once.
        if !raw.is_null() && !unsafe { self.engine.linkage_free_diagram(raw) } {
            warn!("engine exports no diagram release function; diagram string leaked");
        }
        copied
    }
}

impl<E: Engine> Drop for Linkage<'_, E> {
    fn drop(&mut self) {
        trace!(index = self.index, "releasing linkage");
        // SAFETY: created by `self.engine`; any tree borrowing it is gone.
        unsafe { self.engine.linkage_delete(self.raw.as_ptr()) }
    }
}

/// Engine-allocated constituent tree, valid while its linkage is alive.
pub(crate) struct ConstituentTree<'l, E: Engine> {
    engine: &'l E,
    root: NonNull<CNode>,
    _linkage: PhantomData<&'l LinkageRaw>,
}

impl<E: Engine> ConstituentTree<'_, E> {
    pub(crate) fn root(&self) -> *const CNode {
        self.root.as_ptr()
    }
}

impl<E: Engine> Drop for ConstituentTree<'_, E> {
    fn drop(&mut self) {
        // SAFETY: root came from `linkage_constituent_tree` and is released once.
        if !unsafe { self.engine.linkage_free_constituent_tree(self.root.as_ptr()) } {
            trace!("engine keeps constituent tree; no release function exported");
        }
    }
}
