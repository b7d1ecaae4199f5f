use super::tokenizer::{tokenize_query, tokenize_text};
use crate::error::IndexError;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const INDEX_FILE: &str = "terms.json";
/// Added when the whole query appears inside the filename.
pub const FILENAME_BONUS: usize = 1;

/// What the client needs from a search backend: learn a stored file, forget a
/// deleted one, rank filenames for a query.
pub trait DocumentIndex: Send + Sync {
    fn add(&self, filename: &str, text: &str) -> Result<(), IndexError>;

    /// Returns whether the filename was indexed.
    fn remove(&self, filename: &str) -> Result<bool, IndexError>;

    /// Best matches first, at most `limit`.
    fn search(&self, query: &str, limit: usize) -> Vec<(String, usize)>;
}

/// Lexical index persisted as one JSON file mapping filename -> token set.
pub struct TermIndex {
    path: PathBuf,
    documents: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl TermIndex {
    /// Loads `terms.json` from `dir`; a missing file is an empty index.
    pub fn open(dir: &Path) -> Result<Self, IndexError> {
        let path = dir.join(INDEX_FILE);
        let documents = match std::fs::read(&path) {
            Ok(body) => serde_json::from_slice(&body).map_err(|source| IndexError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            documents: RwLock::new(documents),
        })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, BTreeSet<String>>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, BTreeSet<String>>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, documents: &BTreeMap<String, BTreeSet<String>>) -> Result<(), IndexError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_vec(documents).map_err(IndexError::Encode)?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, body)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl DocumentIndex for TermIndex {
    fn add(&self, filename: &str, text: &str) -> Result<(), IndexError> {
        let tokens: BTreeSet<String> = tokenize_text(text).into_iter().collect();
        tracing::debug!("Indexing {} ({} distinct terms)", filename, tokens.len());

        let mut documents = self.write();
        documents.insert(filename.to_string(), tokens);
        self.persist(&documents)
    }

    fn remove(&self, filename: &str) -> Result<bool, IndexError> {
        let mut documents = self.write();
        if documents.remove(filename).is_none() {
            return Ok(false);
        }
        self.persist(&documents)?;
        Ok(true)
    }

    fn search(&self, query: &str, limit: usize) -> Vec<(String, usize)> {
        let query_tokens: HashSet<String> = tokenize_query(query).into_iter().collect();
        let phrase = query.trim().to_lowercase();

        let documents = self.read();
        let mut results: Vec<(String, usize)> = documents
            .iter()
            .filter_map(|(filename, tokens)| {
                let mut score = query_tokens.iter().filter(|t| tokens.contains(*t)).count();
                if !phrase.is_empty() && filename.to_lowercase().contains(&phrase) {
                    score += FILENAME_BONUS;
                }
                (score > 0).then(|| (filename.clone(), score))
            })
            .collect();

        results.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        results.truncate(limit);
        results
    }
}
