//! In-memory vendor corpus loaded from a serialized index file.

use super::tokenize::{term_frequencies, tokenize};
use crate::error::IndexError;
use crate::types::{Document, normalize_url};
use ahash::AHashMap;
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_64;

/// Highest index schema version this reader understands.
pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// Maximum preview length (in characters) synthesized when a page has no preview.
const PREVIEW_CHARS: usize = 300;

/// Only the version field, read before committing to the full layout.
#[derive(Deserialize)]
struct SchemaHeader {
    #[serde(default)]
    schema_version: Option<u32>,
}

/// On-disk layout written by the index builder.
#[derive(Deserialize)]
struct IndexFile {
    vendor: String,
    version: String,
    #[serde(default)]
    built_at: Option<String>,
    pages: Vec<PageRecord>,
}

#[derive(Deserialize)]
struct PageRecord {
    url: String,
    title: String,
    #[serde(default = "default_section")]
    section: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    content_preview: String,
}

fn default_section() -> String {
    "General".to_string()
}

fn default_language() -> String {
    "All".to_string()
}

/// Term statistics derived once at load time.
#[derive(Debug, Clone, Default)]
pub(crate) struct TermStats {
    /// Per-document term frequencies, indexed by document id
    pub(crate) doc_terms: Vec<AHashMap<String, u32>>,
    /// Per-document token counts
    pub(crate) doc_lengths: Vec<u32>,
    /// Number of documents containing each term
    pub(crate) doc_freq: AHashMap<String, u32>,
    pub(crate) avg_doc_len: f64,
}

/// An immutable vendor corpus plus the statistics BM25 needs.
///
/// Never mutated after [`CorpusIndex::load`]; a reload builds a new instance and
/// swaps the reference.
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    vendor: String,
    version: String,
    built_at: Option<String>,
    documents: Vec<Document>,
    stats: TermStats,
    by_url: AHashMap<String, usize>,
    fingerprint: u64,
}

impl CorpusIndex {
    /// Parses an index file already resident in memory.
    ///
    /// Pure: identical bytes always produce identical documents and statistics.
    pub fn load(bytes: &[u8]) -> Result<Self, IndexError> {
        let header: SchemaHeader =
            serde_json::from_slice(bytes).map_err(|e| IndexError::Corrupt {
                reason: e.to_string(),
            })?;

        let found = header.schema_version.unwrap_or(1);
        if found != INDEX_SCHEMA_VERSION {
            return Err(IndexError::VersionMismatch {
                found,
                supported: INDEX_SCHEMA_VERSION,
            });
        }

        let file: IndexFile = serde_json::from_slice(bytes).map_err(|e| IndexError::Corrupt {
            reason: e.to_string(),
        })?;

        let mut index = Self::from_file(file)?;
        index.fingerprint = Self::fingerprint_of(bytes);
        Ok(index)
    }

    /// The fingerprint [`CorpusIndex::load`] would record for `bytes`.
    pub fn fingerprint_of(bytes: &[u8]) -> u64 {
        xxh3_64(bytes)
    }

    fn from_file(file: IndexFile) -> Result<Self, IndexError> {
        if file.vendor.trim().is_empty() {
            return Err(IndexError::Corrupt {
                reason: "field `vendor` is empty".to_string(),
            });
        }

        let mut documents = Vec::with_capacity(file.pages.len());
        for (position, page) in file.pages.into_iter().enumerate() {
            if page.url.trim().is_empty() {
                return Err(IndexError::Corrupt {
                    reason: format!("page {} has an empty `url`", position),
                });
            }
            let id = u32::try_from(position).map_err(|_| IndexError::Corrupt {
                reason: "too many pages".to_string(),
            })?;
            let preview_text = if page.content_preview.trim().is_empty() {
                make_preview(&page.content)
            } else {
                page.content_preview
            };
            documents.push(Document {
                id,
                url: page.url,
                title: page.title,
                section: page.section,
                language: page.language,
                version: file.version.clone(),
                full_text: page.content,
                preview_text,
            });
        }

        let stats = compute_stats(&documents);

        // First occurrence wins for duplicate URLs
        let mut by_url = AHashMap::with_capacity(documents.len());
        for (idx, doc) in documents.iter().enumerate() {
            by_url.entry(normalize_url(&doc.url)).or_insert(idx);
        }

        tracing::debug!(
            "Loaded index for '{}' ({} documents, {} unique terms)",
            file.vendor,
            documents.len(),
            stats.doc_freq.len()
        );

        Ok(Self {
            vendor: file.vendor,
            version: file.version,
            built_at: file.built_at,
            documents,
            stats,
            by_url,
            fingerprint: 0,
        })
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn built_at(&self) -> Option<&str> {
        self.built_at.as_deref()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.stats.doc_freq.len()
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Number of documents containing `term` (already tokenized).
    pub fn document_frequency(&self, term: &str) -> u32 {
        self.stats.doc_freq.get(term).copied().unwrap_or(0)
    }

    pub fn average_document_length(&self) -> f64 {
        self.stats.avg_doc_len
    }

    /// Finds the indexed page for `url`, comparing normalized forms.
    pub fn find_by_url(&self, url: &str) -> Option<&Document> {
        self.by_url
            .get(&normalize_url(url))
            .map(|&idx| &self.documents[idx])
    }

    pub(crate) fn stats(&self) -> &TermStats {
        &self.stats
    }
}

/// Text that contributes to a document's terms.
fn indexed_text(doc: &Document) -> String {
    format!("{} {} {}", doc.title, doc.section, doc.full_text)
}

fn compute_stats(documents: &[Document]) -> TermStats {
    let mut doc_terms = Vec::with_capacity(documents.len());
    let mut doc_lengths = Vec::with_capacity(documents.len());
    let mut doc_freq: AHashMap<String, u32> = AHashMap::new();
    let mut total_len: u64 = 0;

    for doc in documents {
        let tokens = tokenize(&indexed_text(doc));
        let length = u32::try_from(tokens.len()).unwrap_or(u32::MAX);
        total_len += u64::from(length);

        let counts = term_frequencies(&tokens);
        for term in counts.keys() {
            *doc_freq.entry(term.clone()).or_insert(0) += 1;
        }

        doc_lengths.push(length);
        doc_terms.push(counts);
    }

    let avg_doc_len = if documents.is_empty() {
        0.0
    } else {
        total_len as f64 / documents.len() as f64
    };

    TermStats {
        doc_terms,
        doc_lengths,
        doc_freq,
        avg_doc_len,
    }
}

/// Builds a preview from page content, preferring to end on a word boundary.
pub(crate) fn make_preview(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }

    let cut = content
        .char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(content.len(), |(idx, _)| idx);
    let head = &content[..cut];
    let head = match head.rfind(' ') {
        Some(space) if space > cut / 2 => &head[..space],
        _ => head,
    };
    format!("{}...", head.trim_end())
}
