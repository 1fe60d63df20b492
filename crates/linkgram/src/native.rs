//! Dynamic loading of the link-grammar shared library.
//!
//! The engine is opened at runtime with `libloading` and its entry points are
//! resolved once into a table of function pointers.
//!
//! # Lifetime Requirements
//!
//! The function pointers point into the loaded library's code, so the
//! `Library` is stored next to them and lives exactly as long as the
//! `NativeEngine`. Sessions hold the engine behind an `Arc` from every handle
//! guard, so the library cannot be unloaded while any handle is alive.
//!
//! # Search order
//!
//! 1. The explicit path from configuration, if any (no fallback).
//! 2. `LINKGRAM_LIBRARY_PATH` (colon-separated directories).
//! 3. The bare platform library name, resolved by the system loader.
//!
//! # ABI generations
//!
//! The 5.x API widened linkage, link and word indices from `int` to `size_t`
//! and gave `linkage_print_diagram` two layout arguments. The loader picks
//! the matching signatures once, from the exported symbol set, so no call
//! ever goes through a pointer of the wrong type.

use crate::engine::{Engine, ParseOption};
use crate::error::{Error, Result};
use crate::ffi::{CNode, DictionaryRaw, LinkageRaw, ParseOptionsRaw, SentenceRaw};
use libloading::{Library, Symbol};
use std::ffi::{CStr, c_char, c_int};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable listing directories to search for the library.
pub const LIBRARY_PATH_ENV: &str = "LINKGRAM_LIBRARY_PATH";

type OptionsCreateFn = unsafe extern "C" fn() -> *mut ParseOptionsRaw;
type OptionsDeleteFn = unsafe extern "C" fn(*mut ParseOptionsRaw) -> c_int;
type OptionsSetFn = unsafe extern "C" fn(*mut ParseOptionsRaw, c_int);
type DictionaryCreateFn = unsafe extern "C" fn(
    *mut c_char,
    *mut c_char,
    *mut c_char,
    *mut c_char,
) -> *mut DictionaryRaw;
type DictionaryDeleteFn = unsafe extern "C" fn(*mut DictionaryRaw) -> c_int;
type SentenceCreateFn = unsafe extern "C" fn(*mut c_char, *mut DictionaryRaw) -> *mut SentenceRaw;
type SentenceDeleteFn = unsafe extern "C" fn(*mut SentenceRaw);
type SentenceParseFn = unsafe extern "C" fn(*mut SentenceRaw, *mut ParseOptionsRaw) -> c_int;
type SentenceIntFn = unsafe extern "C" fn(*mut SentenceRaw) -> c_int;
type LinkageDeleteFn = unsafe extern "C" fn(*mut LinkageRaw);
type ConstituentTreeFn = unsafe extern "C" fn(*mut LinkageRaw) -> *mut CNode;
type FreeConstituentTreeFn = unsafe extern "C" fn(*mut CNode);
type LinkageIntFn = unsafe extern "C" fn(*mut LinkageRaw) -> c_int;
type LinkageCreateFn<I> =
    unsafe extern "C" fn(I, *mut SentenceRaw, *mut ParseOptionsRaw) -> *mut LinkageRaw;
type ClassicDiagramFn = unsafe extern "C" fn(*mut LinkageRaw) -> *mut c_char;
type ModernDiagramFn = unsafe extern "C" fn(*mut LinkageRaw, bool, usize) -> *mut c_char;
type FreeStringFn = unsafe extern "C" fn(*mut c_char);

/// Which release line of the C API the library belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generation {
    /// Up to 4.x: `int` indices, one-argument diagram printer.
    Classic,
    /// 5.x: `size_t` indices, diagram printer with layout arguments.
    Modern,
}

impl Generation {
    /// `sentence_split` only exists in the 5.x API.
    ///
    /// # Safety
    ///
    /// As for [`required`].
    unsafe fn detect(library: &Library) -> Self {
        let split: Option<SentenceParseFn> = unsafe { optional(library, "sentence_split") };
        match split {
            Some(_) => Generation::Modern,
            None => Generation::Classic,
        }
    }
}

/// Integer type the linkage accessors use for indices and counts.
trait AbiIndex: Copy + Send + Sync + 'static {
    fn from_c_int(value: c_int) -> Self;
    /// Out-of-range values become `-1`, which callers reject.
    fn into_c_int(self) -> c_int;
}

impl AbiIndex for c_int {
    fn from_c_int(value: c_int) -> Self {
        value
    }

    fn into_c_int(self) -> c_int {
        self
    }
}

impl AbiIndex for usize {
    fn from_c_int(value: c_int) -> Self {
        usize::try_from(value).unwrap_or(usize::MAX)
    }

    fn into_c_int(self) -> c_int {
        c_int::try_from(self).unwrap_or(-1)
    }
}

/// Linkage entry points whose index width depends on the generation.
struct Indexed<I: AbiIndex> {
    linkage_create: LinkageCreateFn<I>,
    num_words: unsafe extern "C" fn(*mut LinkageRaw) -> I,
    num_links: unsafe extern "C" fn(*mut LinkageRaw) -> I,
    link_label: unsafe extern "C" fn(*mut LinkageRaw, I) -> *const c_char,
    link_llabel: unsafe extern "C" fn(*mut LinkageRaw, I) -> *const c_char,
    link_rlabel: unsafe extern "C" fn(*mut LinkageRaw, I) -> *const c_char,
    link_lword: unsafe extern "C" fn(*mut LinkageRaw, I) -> I,
    link_rword: unsafe extern "C" fn(*mut LinkageRaw, I) -> I,
    link_length: unsafe extern "C" fn(*mut LinkageRaw, I) -> c_int,
    word: unsafe extern "C" fn(*mut LinkageRaw, I) -> *const c_char,
}

impl<I: AbiIndex> Indexed<I> {
    /// # Safety
    ///
    /// `I` must be the index type of the library's generation.
    unsafe fn resolve(library: &Library) -> Result<Self> {
        // SAFETY: forwarded to the caller.
        unsafe {
            Ok(Self {
                linkage_create: required(library, "linkage_create")?,
                num_words: required(library, "linkage_get_num_words")?,
                num_links: required(library, "linkage_get_num_links")?,
                link_label: required(library, "linkage_get_link_label")?,
                link_llabel: required(library, "linkage_get_link_llabel")?,
                link_rlabel: required(library, "linkage_get_link_rlabel")?,
                link_lword: required(library, "linkage_get_link_lword")?,
                link_rword: required(library, "linkage_get_link_rword")?,
                link_length: required(library, "linkage_get_link_length")?,
                word: required(library, "linkage_get_word")?,
            })
        }
    }
}

/// The generation-dependent linkage calls, seen through `c_int`.
///
/// Method contracts are those of the matching [`Engine`] methods.
trait LinkageAccess: Send + Sync {
    unsafe fn create(
        &self,
        index: c_int,
        sent: *mut SentenceRaw,
        opts: *mut ParseOptionsRaw,
    ) -> *mut LinkageRaw;
    unsafe fn num_words(&self, linkage: *mut LinkageRaw) -> c_int;
    unsafe fn num_links(&self, linkage: *mut LinkageRaw) -> c_int;
    unsafe fn link_label(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char;
    unsafe fn link_llabel(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char;
    unsafe fn link_rlabel(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char;
    unsafe fn link_lword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    unsafe fn link_rword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    unsafe fn link_length(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int;
    unsafe fn word(&self, linkage: *mut LinkageRaw, word: c_int) -> *const c_char;
}

impl<I: AbiIndex> LinkageAccess for Indexed<I> {
    unsafe fn create(
        &self,
        index: c_int,
        sent: *mut SentenceRaw,
        opts: *mut ParseOptionsRaw,
    ) -> *mut LinkageRaw {
        unsafe { (self.linkage_create)(I::from_c_int(index), sent, opts) }
    }

    unsafe fn num_words(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { (self.num_words)(linkage) }.into_c_int()
    }

    unsafe fn num_links(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { (self.num_links)(linkage) }.into_c_int()
    }

    unsafe fn link_label(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char {
        unsafe { (self.link_label)(linkage, I::from_c_int(index)) }
    }

    unsafe fn link_llabel(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char {
        unsafe { (self.link_llabel)(linkage, I::from_c_int(index)) }
    }

    unsafe fn link_rlabel(&self, linkage: *mut LinkageRaw, index: c_int) -> *const c_char {
        unsafe { (self.link_rlabel)(linkage, I::from_c_int(index)) }
    }

    unsafe fn link_lword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { (self.link_lword)(linkage, I::from_c_int(index)) }.into_c_int()
    }

    unsafe fn link_rword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { (self.link_rword)(linkage, I::from_c_int(index)) }.into_c_int()
    }

    unsafe fn link_length(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { (self.link_length)(linkage, I::from_c_int(index)) }
    }

    unsafe fn word(&self, linkage: *mut LinkageRaw, word: c_int) -> *const c_char {
        unsafe { (self.word)(linkage, I::from_c_int(word)) }
    }
}

/// `linkage_print_diagram` in the shape the library exports it.
#[derive(Clone, Copy)]
enum DiagramPrinter {
    /// Layout comes from the parse options.
    Classic(ClassicDiagramFn),
    Modern(ModernDiagramFn),
}

impl DiagramPrinter {
    /// # Safety
    ///
    /// `linkage` must be a live linkage handle of the library the printer
    /// was resolved from.
    unsafe fn print(
        self,
        linkage: *mut LinkageRaw,
        display_walls: bool,
        screen_width: usize,
    ) -> *mut c_char {
        match self {
            DiagramPrinter::Classic(print) => unsafe { print(linkage) },
            DiagramPrinter::Modern(print) => unsafe { print(linkage, display_walls, screen_width) },
        }
    }
}

/// Entry points resolved from the library.
struct Api {
    generation: Generation,
    parse_options_create: OptionsCreateFn,
    parse_options_delete: OptionsDeleteFn,
    set_verbosity: OptionsSetFn,
    set_linkage_limit: OptionsSetFn,
    set_max_parse_time: OptionsSetFn,
    set_min_null_count: OptionsSetFn,
    set_max_null_count: OptionsSetFn,
    dictionary_create: DictionaryCreateFn,
    dictionary_delete: DictionaryDeleteFn,
    sentence_create: SentenceCreateFn,
    sentence_delete: SentenceDeleteFn,
    sentence_parse: SentenceParseFn,
    sentence_null_count: SentenceIntFn,
    linkage_delete: LinkageDeleteFn,
    linkage_constituent_tree: ConstituentTreeFn,
    linkage_link_cost: LinkageIntFn,
    linkages: Box<dyn LinkageAccess>,
    // Not exported by every release.
    linkage_free_constituent_tree: Option<FreeConstituentTreeFn>,
    linkage_print_diagram: Option<DiagramPrinter>,
    free_diagram: Option<FreeStringFn>,
}

/// Fetch a required symbol, copying the function pointer out.
///
/// # Safety
///
/// `T` must be the symbol's real C signature.
unsafe fn required<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    // SAFETY: forwarded to the caller.
    let sym: Symbol<T> = unsafe { library.get(symbol.as_bytes()) }
        .map_err(|_| Error::MissingSymbol { symbol })?;
    Ok(*sym)
}

/// Fetch an optional symbol.
///
/// # Safety
///
/// As for [`required`].
unsafe fn optional<T: Copy>(library: &Library, symbol: &'static str) -> Option<T> {
    // SAFETY: forwarded to the caller.
    let sym: Symbol<T> = unsafe { library.get(symbol.as_bytes()) }.ok()?;
    Some(*sym)
}

impl Api {
    /// # Safety
    ///
    /// `library` must be a link-grammar build exporting the C API of one of
    /// the generations declared above.
    unsafe fn resolve(library: &Library) -> Result<Self> {
        // SAFETY: forwarded to the caller; the generation picks the
        // signatures of every symbol whose prototype changed.
        unsafe {
            let generation = Generation::detect(library);
            let (linkages, linkage_print_diagram) = match generation {
                Generation::Classic => (
                    Box::new(Indexed::<c_int>::resolve(library)?) as Box<dyn LinkageAccess>,
                    optional(library, "linkage_print_diagram").map(DiagramPrinter::Classic),
                ),
                Generation::Modern => (
                    Box::new(Indexed::<usize>::resolve(library)?) as Box<dyn LinkageAccess>,
                    optional(library, "linkage_print_diagram").map(DiagramPrinter::Modern),
                ),
            };
            Ok(Self {
                generation,
                parse_options_create: required(library, "parse_options_create")?,
                parse_options_delete: required(library, "parse_options_delete")?,
                set_verbosity: required(library, ParseOption::Verbosity.setter_symbol())?,
                set_linkage_limit: required(library, ParseOption::LinkageLimit.setter_symbol())?,
                set_max_parse_time: required(library, ParseOption::MaxParseTime.setter_symbol())?,
                set_min_null_count: required(library, ParseOption::MinNullCount.setter_symbol())?,
                set_max_null_count: required(library, ParseOption::MaxNullCount.setter_symbol())?,
                dictionary_create: required(library, "dictionary_create")?,
                dictionary_delete: required(library, "dictionary_delete")?,
                sentence_create: required(library, "sentence_create")?,
                sentence_delete: required(library, "sentence_delete")?,
                sentence_parse: required(library, "sentence_parse")?,
                sentence_null_count: required(library, "sentence_null_count")?,
                linkage_delete: required(library, "linkage_delete")?,
                linkage_constituent_tree: required(library, "linkage_constituent_tree")?,
                linkage_link_cost: required(library, "linkage_link_cost")?,
                linkages,
                linkage_free_constituent_tree: optional(library, "linkage_free_constituent_tree"),
                linkage_print_diagram,
                free_diagram: optional(library, "linkage_free_diagram")
                    .or_else(|| optional(library, "string_delete")),
            })
        }
    }
}

/// The link-grammar engine loaded from a shared library.
pub struct NativeEngine {
    api: Api,
    path: PathBuf,
    /// Backing shared library; must outlive every use of `api`.
    _library: Library,
}

impl NativeEngine {
    /// Load the engine from a specific file.
    pub fn open(path: &Path) -> Result<Self> {
        // SAFETY: loading a library runs its initializers. The path is chosen
        // by configuration and expected to be a link-grammar build.
        let library = unsafe { Library::new(path) }.map_err(|source| Error::Library {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: the declared signatures match the link-grammar C API.
        let api = unsafe { Api::resolve(&library)? };

        if api.linkage_free_constituent_tree.is_none() {
            warn!(
                path = %path.display(),
                "linkage_free_constituent_tree not exported; constituent trees stay with the engine"
            );
        }
        debug!(
            path = %path.display(),
            generation = ?api.generation,
            "loaded link-grammar library"
        );
        Ok(Self {
            api,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Locate and load the engine following the search order above.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::open(path);
        }

        let mut last_err = None;
        for candidate in library_candidates() {
            match Self::open(&candidate) {
                Ok(engine) => return Ok(engine),
                Err(err) => {
                    debug!(path = %candidate.display(), error = %err, "candidate rejected");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            Error::Initialization("no link-grammar library candidates".to_string())
        }))
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Candidate library paths, most specific first.
fn library_candidates() -> Vec<PathBuf> {
    let name = library_file_name();
    let mut candidates = Vec::new();

    if let Ok(env_path) = std::env::var(LIBRARY_PATH_ENV) {
        for dir in env_path.split(':').filter(|p| !p.is_empty()) {
            let path = Path::new(dir).join(&name);
            if path.exists() {
                candidates.push(path);
            }
        }
    }

    candidates.push(PathBuf::from(name));
    candidates
}

/// Platform file name of the engine library.
fn library_file_name() -> String {
    if cfg!(target_os = "macos") {
        "liblink-grammar.dylib".to_string()
    } else if cfg!(target_os = "windows") {
        "link-grammar.dll".to_string()
    } else {
        "liblink-grammar.so".to_string()
    }
}

impl Engine for NativeEngine {
    fn parse_options_create(&self) -> *mut ParseOptionsRaw {
        // SAFETY: no arguments; returns a fresh handle or null.
        unsafe { (self.api.parse_options_create)() }
    }

    unsafe fn parse_options_delete(&self, opts: *mut ParseOptionsRaw) {
        unsafe { (self.api.parse_options_delete)(opts) };
    }

    unsafe fn parse_options_set(
        &self,
        opts: *mut ParseOptionsRaw,
        option: ParseOption,
        value: c_int,
    ) {
        let set = match option {
            ParseOption::Verbosity => self.api.set_verbosity,
            ParseOption::LinkageLimit => self.api.set_linkage_limit,
            ParseOption::MaxParseTime => self.api.set_max_parse_time,
            ParseOption::MinNullCount => self.api.set_min_null_count,
            ParseOption::MaxNullCount => self.api.set_max_null_count,
        };
        unsafe { set(opts, value) }
    }

    unsafe fn dictionary_create(
        &self,
        dict: &CStr,
        post_process: &CStr,
        constituent: &CStr,
        affix: &CStr,
    ) -> *mut DictionaryRaw {
        // The C prototype takes `char *` but never writes through it.
        unsafe {
            (self.api.dictionary_create)(
                dict.as_ptr() as *mut c_char,
                post_process.as_ptr() as *mut c_char,
                constituent.as_ptr() as *mut c_char,
                affix.as_ptr() as *mut c_char,
            )
        }
    }

    unsafe fn dictionary_delete(&self, dict: *mut DictionaryRaw) {
        unsafe { (self.api.dictionary_delete)(dict) };
    }

    unsafe fn sentence_create(&self, text: &CStr, dict: *mut DictionaryRaw) -> *mut SentenceRaw {
        unsafe { (self.api.sentence_create)(text.as_ptr() as *mut c_char, dict) }
    }

    unsafe fn sentence_delete(&self, sent: *mut SentenceRaw) {
        unsafe { (self.api.sentence_delete)(sent) }
    }

    unsafe fn sentence_parse(&self, sent: *mut SentenceRaw, opts: *mut ParseOptionsRaw) -> c_int {
        unsafe { (self.api.sentence_parse)(sent, opts) }
    }

    unsafe fn sentence_null_count(&self, sent: *mut SentenceRaw) -> c_int {
        unsafe { (self.api.sentence_null_count)(sent) }
    }

    unsafe fn linkage_create(
        &self,
        index: c_int,
        sent: *mut SentenceRaw,
        opts: *mut ParseOptionsRaw,
    ) -> *mut LinkageRaw {
        unsafe { self.api.linkages.create(index, sent, opts) }
    }

    unsafe fn linkage_delete(&self, linkage: *mut LinkageRaw) {
        unsafe { (self.api.linkage_delete)(linkage) }
    }

    unsafe fn linkage_constituent_tree(&self, linkage: *mut LinkageRaw) -> *mut CNode {
        unsafe { (self.api.linkage_constituent_tree)(linkage) }
    }

    unsafe fn linkage_free_constituent_tree(&self, root: *mut CNode) -> bool {
        match self.api.linkage_free_constituent_tree {
            Some(free) => {
                unsafe { free(root) };
                true
            }
            None => false,
        }
    }

    unsafe fn linkage_get_num_words(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { self.api.linkages.num_words(linkage) }
    }

    unsafe fn linkage_get_num_links(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { self.api.linkages.num_links(linkage) }
    }

    unsafe fn linkage_get_link_label(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        unsafe { self.api.linkages.link_label(linkage, index) }
    }

    unsafe fn linkage_get_link_llabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        unsafe { self.api.linkages.link_llabel(linkage, index) }
    }

    unsafe fn linkage_get_link_rlabel(
        &self,
        linkage: *mut LinkageRaw,
        index: c_int,
    ) -> *const c_char {
        unsafe { self.api.linkages.link_rlabel(linkage, index) }
    }

    unsafe fn linkage_get_link_lword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { self.api.linkages.link_lword(linkage, index) }
    }

    unsafe fn linkage_get_link_rword(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { self.api.linkages.link_rword(linkage, index) }
    }

    unsafe fn linkage_get_link_length(&self, linkage: *mut LinkageRaw, index: c_int) -> c_int {
        unsafe { self.api.linkages.link_length(linkage, index) }
    }

    unsafe fn linkage_get_word(&self, linkage: *mut LinkageRaw, word: c_int) -> *const c_char {
        unsafe { self.api.linkages.word(linkage, word) }
    }

    unsafe fn linkage_link_cost(&self, linkage: *mut LinkageRaw) -> c_int {
        unsafe { (self.api.linkage_link_cost)(linkage) }
    }

    unsafe fn linkage_print_diagram(
        &self,
        linkage: *mut LinkageRaw,
        display_walls: bool,
        screen_width: usize,
    ) -> Option<*mut c_char> {
        let printer = self.api.linkage_print_diagram?;
        Some(unsafe { printer.print(linkage, display_walls, screen_width) })
    }

    unsafe fn linkage_free_diagram(&self, diagram: *mut c_char) -> bool {
        match self.api.free_diagram {
            Some(free) => {
                unsafe { free(diagram) };
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // set_var/remove_var are unsafe in edition 2024; serialize the tests
    // that touch the environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_library_file_name() {
        let name = library_file_name();
        assert!(name.contains("link-grammar"));
    }

    #[test]
    fn test_candidates_end_with_system_name() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { std::env::remove_var(LIBRARY_PATH_ENV) };
        assert_eq!(library_candidates(), vec![PathBuf::from(library_file_name())]);
    }

    #[test]
    fn test_candidates_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let lib = dir.path().join(library_file_name());
        std::fs::write(&lib, b"").unwrap();

        let value = format!("/nonexistent/lg::{}", dir.path().display());
        unsafe { std::env::set_var(LIBRARY_PATH_ENV, &value) };
        let candidates = library_candidates();
        unsafe { std::env::remove_var(LIBRARY_PATH_ENV) };

        assert_eq!(candidates, vec![lib, PathBuf::from(library_file_name())]);
    }

    #[test]
    fn test_open_missing_library() {
        let err = NativeEngine::open(Path::new("/nonexistent/liblink-grammar.so"))
            .err()
            .expect("loading a missing library must fail");
        assert!(matches!(err, Error::Library { .. }), "{err}");
    }

    #[test]
    fn test_open_non_library_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(library_file_name());
        std::fs::write(&path, b"not a shared object").unwrap();
        let err = NativeEngine::locate(Some(&path))
            .err()
            .expect("a text file is not a library");
        assert!(matches!(err, Error::Library { .. }), "{err}");
    }

    static PRINTED: Mutex<Vec<(bool, usize)>> = Mutex::new(Vec::new());

    unsafe extern "C" fn modern_print(
        _linkage: *mut LinkageRaw,
        display_walls: bool,
        screen_width: usize,
    ) -> *mut c_char {
        PRINTED.lock().unwrap().push((display_walls, screen_width));
        std::ptr::null_mut()
    }

    unsafe extern "C" fn classic_print(_linkage: *mut LinkageRaw) -> *mut c_char {
        PRINTED.lock().unwrap().push((true, 0));
        std::ptr::null_mut()
    }

    #[test]
    fn test_diagram_printer_passes_layout_by_generation() {
        let linkage = std::ptr::NonNull::<LinkageRaw>::dangling().as_ptr();
        PRINTED.lock().unwrap().clear();
        unsafe {
            DiagramPrinter::Modern(modern_print).print(linkage, false, 180);
            DiagramPrinter::Classic(classic_print).print(linkage, false, 180);
        }
        assert_eq!(*PRINTED.lock().unwrap(), vec![(false, 180), (true, 0)]);
    }

    #[test]
    fn test_size_indices_round_trip_through_c_int() {
        assert_eq!(<usize as AbiIndex>::from_c_int(7), 7);
        assert_eq!(AbiIndex::into_c_int(7usize), 7);
        assert_eq!(AbiIndex::into_c_int(usize::MAX), -1);
        assert_eq!(<usize as AbiIndex>::from_c_int(-1), usize::MAX);
        assert_eq!(AbiIndex::into_c_int(-3 as c_int), -3);
    }
}
