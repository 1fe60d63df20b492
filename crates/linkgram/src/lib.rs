//! Safe bindings to the link-grammar parser.
//!
//! The parser itself lives in a native shared library loaded at runtime (see
//! [`NativeEngine`]). This crate drives its handle lifecycle and copies its
//! pointer-linked results into owned Rust values:
//!
//! - [`ConstituentNode`]: the phrase-structure tree of a linkage
//! - [`Link`]: one labeled connection, with [`Endpoint`] words split into
//!   word and grammatical subtype (`light.n` becomes `light` + `n`)
//! - [`ParsedLinkage`]: a linkage's words, links, link lengths and costs
//!
//! Nothing returned by a [`ParserSession`] points into engine memory.
//!
//! # Example
//!
//! ```no_run
//! use linkgram::{ParserConfig, ParserSession};
//!
//! let session = ParserSession::create(&ParserConfig::default())?;
//! for (i, links) in session.parse_all_linkages("turn off the light")?.iter().enumerate() {
//!     for link in links {
//!         println!("{i}: {} {} -> {}", link.label, link.left.word, link.right.word);
//!     }
//! }
//! println!("{}", session.parse_constituent_tree("turn off the light")?);
//! # Ok::<(), linkgram::Error>(())
//! ```

pub mod config;
pub mod engine;
mod error;
pub mod ffi;
mod graph;
mod handle;
mod native;
mod session;
mod split;
#[cfg(test)]
mod testing;
mod tree;

pub use config::{ConfigOverrides, ParseOptionsConfig, ParserConfig};
pub use engine::{Engine, ParseOption};
pub use error::{Error, Result};
pub use graph::{Endpoint, Link, ParsedLinkage, connector_words, links_by_label};
pub use native::{LIBRARY_PATH_ENV, NativeEngine};
pub use session::ParserSession;
pub use split::{SUBTYPE_SEPARATOR, split_word_type};
pub use tree::{Children, ConstituentNode, MAX_CONSTITUENT_DEPTH, MAX_CONSTITUENT_NODES, Walk};
