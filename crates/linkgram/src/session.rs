//! Parser sessions.
//!
//! A session owns one options handle and one dictionary handle for its whole
//! lifetime. Each request creates its sentence and linkage handles, copies out
//! what it needs, and releases them before returning, on success and on
//! error alike.
//!
//! The engine gives no thread-safety guarantees for a handle set, so every
//! request takes the session's mutex: one in-flight parse per session.
//! Separate sessions own separate handle sets.

use crate::config::ParserConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::{Link, ParsedLinkage, extract_linkage, extract_links};
use crate::handle::{Dictionary, Linkage, Options, Sentence};
use crate::native::NativeEngine;
use crate::tree::{self, ConstituentNode};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Handles owned for the session's lifetime. Field order is release order.
struct SessionHandles<E: Engine> {
    dictionary: Dictionary<E>,
    options: Options<E>,
}

pub struct ParserSession<E: Engine = NativeEngine> {
    handles: Mutex<SessionHandles<E>>,
}

impl ParserSession<NativeEngine> {
    /// Load the engine library and open the configured dictionary.
    pub fn create(config: &ParserConfig) -> Result<Self> {
        let engine = NativeEngine::locate(config.library.as_deref())?;
        debug!(library = %engine.path().display(), "using link-grammar library");
        Self::with_engine(engine, config)
    }
}

impl<E: Engine> ParserSession<E> {
    /// Open the configured dictionary on an already loaded engine.
    ///
    /// Relative dictionary names go to the engine as given; it resolves them
    /// against its own data directories.
    pub fn with_engine(engine: E, config: &ParserConfig) -> Result<Self> {
        if config.dictionary.is_absolute() && !config.dictionary.exists() {
            return Err(Error::Initialization(format!(
                "dictionary {} does not exist",
                config.dictionary.display()
            )));
        }

        let engine = Arc::new(engine);
        let options = Options::create(Arc::clone(&engine))?;
        options.apply(&config.options);
        // On failure `options` is dropped, and released, here.
        let dictionary = Dictionary::create(engine, &config.dictionary_paths())?;

        debug!(dictionary = %config.dictionary.display(), "parser session ready");
        Ok(Self {
            handles: Mutex::new(SessionHandles {
                dictionary,
                options,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionHandles<E>>> {
        self.handles.lock().map_err(|_| Error::SessionPoisoned)
    }

    /// Number of linkages the engine finds for `text`.
    pub fn linkage_count(&self, text: &str) -> Result<usize> {
        let handles = self.lock()?;
        let sentence = Sentence::create(&handles.dictionary, text)?;
        sentence.parse(&handles.options)
    }

    /// Constituent tree of the first linkage.
    ///
    /// Fails with [`Error::NoLinkageFound`] when the sentence has no parse.
    pub fn parse_constituent_tree(&self, text: &str) -> Result<ConstituentNode> {
        let handles = self.lock()?;
        let sentence = Sentence::create(&handles.dictionary, text)?;
        if sentence.parse(&handles.options)? == 0 {
            return Err(Error::NoLinkageFound);
        }
        let linkage = Linkage::create(&sentence, &handles.options, 0)?;
        let foreign = linkage.constituent_tree()?;
        tree::decode(&foreign)
    }

    /// Links of every linkage, outer order being linkage index order.
    ///
    /// A sentence with no parse yields an empty vector.
    pub fn parse_all_linkages(&self, text: &str) -> Result<Vec<Vec<Link>>> {
        let handles = self.lock()?;
        let sentence = Sentence::create(&handles.dictionary, text)?;
        let count = sentence.parse(&handles.options)?;
        (0..count)
            .map(|index| {
                let linkage = Linkage::create(&sentence, &handles.options, index)?;
                extract_links(&linkage)
            })
            .collect()
    }

    /// Words, links, link lengths and costs of every linkage, in index
    /// order. A sentence with no parse yields an empty vector.
    pub fn parse_linkages(&self, text: &str) -> Result<Vec<ParsedLinkage>> {
        let handles = self.lock()?;
        let sentence = Sentence::create(&handles.dictionary, text)?;
        let count = sentence.parse(&handles.options)?;
        let null_count = sentence.null_count()?;
        (0..count)
            .map(|index| {
                let linkage = Linkage::create(&sentence, &handles.options, index)?;
                extract_linkage(&linkage, null_count)
            })
            .collect()
    }

    /// ASCII link diagram of the first linkage.
    pub fn diagram(&self, text: &str) -> Result<String> {
        let handles = self.lock()?;
        let sentence = Sentence::create(&handles.dictionary, text)?;
        if sentence.parse(&handles.options)? == 0 {
            return Err(Error::NoLinkageFound);
        }
        let linkage = Linkage::create(&sentence, &handles.options, 0)?;
        linkage.diagram()
    }
}
