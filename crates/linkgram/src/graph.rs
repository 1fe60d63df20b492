//! Link lists and linkage summaries extracted from a linkage.

use crate::engine::Engine;
use crate::error::Result;
use crate::handle::Linkage;
use crate::split::split_word_type;
use serde::{Deserialize, Serialize};

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Connector sub-label on this side (e.g. `Ds`).
    pub label: String,
    /// Surface word with any subtype marker removed.
    pub word: String,
    /// Grammatical subtype (`n`, `v`, ...) if the token carried one.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub word_type: Option<String>,
}

impl Endpoint {
    /// Build an endpoint from a raw dictionary token such as `light.n`.
    pub fn from_token(label: impl Into<String>, token: &str) -> Self {
        let (word, word_type) = split_word_type(token);
        Self {
            label: label.into(),
            word: word.to_string(),
            word_type: word_type.map(str::to_string),
        }
    }
}

/// A labeled connection between two words of a linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub left: Endpoint,
    pub right: Endpoint,
}

impl Link {
    /// The endpoint opposite `word`, if either side is `word` (subtype
    /// ignored). A link from a word to itself yields its right endpoint.
    pub fn other_end(&self, word: &str) -> Option<&Endpoint> {
        if self.left.word == word {
            Some(&self.right)
        } else if self.right.word == word {
            Some(&self.left)
        } else {
            None
        }
    }
}

/// One linkage with the engine's bookkeeping alongside its links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLinkage {
    /// Position in the sentence's linkage order.
    pub index: usize,
    /// Raw tokens, walls included, subtype markers kept.
    pub words: Vec<String>,
    pub links: Vec<Link>,
    /// Words spanned by each link, parallel to `links`.
    pub link_lengths: Vec<usize>,
    /// Total link length cost the engine ranked this linkage by.
    pub link_cost: i32,
    /// Words the parse skipped. Shared by every linkage of a sentence.
    pub null_count: usize,
}

/// Read every link of `linkage` in engine index order.
pub(crate) fn extract_links<E: Engine>(linkage: &Linkage<'_, E>) -> Result<Vec<Link>> {
    let num_links = linkage.num_links()?;
    let mut links = Vec::with_capacity(num_links);
    for index in 0..num_links {
        let label = linkage.link_label(index)?;
        let left_label = linkage.link_left_label(index)?;
        let right_label = linkage.link_right_label(index)?;
        let left_word = linkage.word(linkage.link_left_word(index)?)?;
        let right_word = linkage.word(linkage.link_right_word(index)?)?;
        links.push(Link {
            label,
            left: Endpoint::from_token(left_label, &left_word),
            right: Endpoint::from_token(right_label, &right_word),
        });
    }
    tracing::trace!(linkage = linkage.index(), links = links.len(), "extracted links");
    Ok(links)
}

/// Read the words, links and costs of `linkage`.
pub(crate) fn extract_linkage<E: Engine>(
    linkage: &Linkage<'_, E>,
    null_count: usize,
) -> Result<ParsedLinkage> {
    let words = (0..linkage.num_words()?)
        .map(|w| linkage.word(w))
        .collect::<Result<Vec<_>>>()?;
    let links = extract_links(linkage)?;
    let link_lengths = (0..links.len())
        .map(|i| linkage.link_length(i))
        .collect::<Result<Vec<_>>>()?;
    Ok(ParsedLinkage {
        index: linkage.index(),
        words,
        links,
        link_lengths,
        link_cost: linkage.link_cost(),
        null_count,
    })
}

/// Links whose label is exactly `label`, in order.
pub fn links_by_label<'a>(links: &'a [Link], label: &'a str) -> impl Iterator<Item = &'a Link> {
    links.iter().filter(move |link| link.label == label)
}

/// For each link touching `word`, the endpoint on the other side.
///
/// A link from a word to itself yields that endpoint once.
pub fn connector_words<'a>(links: &'a [Link], word: &'a str) -> Vec<&'a Endpoint> {
    links.iter().filter_map(|link| link.other_end(word)).collect()
}
