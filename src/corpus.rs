//! Access to the BSL text module corpus.
//!
//! The corpus is a directory tree of `.bsl` modules. Occurrence search is
//! a case-insensitive identifier match (BSL identifiers are
//! case-insensitive) yielded as a lazy, restartable iterator so callers
//! can stop at their collection cap without scanning the whole corpus.

use crate::error::QueryError;
use crate::model::{CorpusOccurrence, FragmentAddress, MethodDecl};
use ignore::WalkBuilder;
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

/// Path segment marking the corpus root inside exported module paths.
/// Display paths strip everything up to and including it.
const CORPUS_ROOT_MARKER: &str = "src";

pub trait CorpusIndex {
    /// Every textual occurrence of any of `identifiers` anywhere in the
    /// corpus, lazily. The sequence is restartable; each call walks the
    /// corpus afresh.
    fn find_occurrences(
        &self,
        identifiers: &[String],
    ) -> Result<Box<dyn Iterator<Item = CorpusOccurrence> + '_>, QueryError>;

    /// Load the text of one module by corpus-relative path.
    fn load_module(&self, module_path: &str) -> Result<String, QueryError>;

    /// Procedure/function declarations of one module, in source order.
    fn module_methods(&self, module_path: &str) -> Result<Vec<MethodDecl>, QueryError>;
}

/// Production corpus over a directory of `.bsl` files.
pub struct FsCorpus {
    root: PathBuf,
}

impl FsCorpus {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn module_files(&self) -> Result<Vec<String>, QueryError> {
        if !self.root.is_dir() {
            return Err(QueryError::CorpusUnavailable(format!(
                "corpus root {} is not a directory",
                self.root.display()
            )));
        }
        let mut files = Vec::new();
        for entry in WalkBuilder::new(&self.root).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    eprintln!("mdxref: corpus walk: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bsl") {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&self.root) {
                files.push(normalize_path(rel));
            }
        }
        files.sort();
        Ok(files)
    }
}

impl CorpusIndex for FsCorpus {
    fn find_occurrences(
        &self,
        identifiers: &[String],
    ) -> Result<Box<dyn Iterator<Item = CorpusOccurrence> + '_>, QueryError> {
        let needles: Vec<String> = identifiers
            .iter()
            .filter(|n| !n.is_empty())
            .cloned()
            .collect();
        if needles.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        let files = self.module_files()?;
        Ok(Box::new(OccurrenceIter {
            corpus: self,
            files: files.into_iter(),
            needles,
            pending: VecDeque::new(),
        }))
    }

    fn load_module(&self, module_path: &str) -> Result<String, QueryError> {
        let abs = self.root.join(module_path);
        std::fs::read_to_string(&abs).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                QueryError::ModuleNotFound {
                    path: module_path.to_string(),
                }
            } else {
                QueryError::CorpusUnavailable(format!("read {}: {err}", abs.display()))
            }
        })
    }

    fn module_methods(&self, module_path: &str) -> Result<Vec<MethodDecl>, QueryError> {
        let content = self.load_module(module_path)?;
        Ok(scan_method_declarations(&content))
    }
}

struct OccurrenceIter<'a> {
    corpus: &'a FsCorpus,
    files: std::vec::IntoIter<String>,
    needles: Vec<String>,
    pending: VecDeque<CorpusOccurrence>,
}

impl Iterator for OccurrenceIter<'_> {
    type Item = CorpusOccurrence;

    fn next(&mut self) -> Option<CorpusOccurrence> {
        loop {
            if let Some(occurrence) = self.pending.pop_front() {
                return Some(occurrence);
            }
            let module_path = self.files.next()?;
            let content = match self.corpus.load_module(&module_path) {
                Ok(content) => content,
                Err(err) => {
                    eprintln!("mdxref: corpus: skipping {module_path}: {err}");
                    continue;
                }
            };
            let mut offsets: Vec<usize> = Vec::new();
            for needle in &self.needles {
                offsets.extend(find_identifier(&content, needle));
            }
            offsets.sort_unstable();
            offsets.dedup();
            self.pending.extend(offsets.into_iter().map(|offset| CorpusOccurrence {
                module_path: module_path.clone(),
                address: FragmentAddress::Offset(offset),
            }));
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Byte offsets of whole-identifier matches of `needle` in `content`,
/// ignoring ASCII case.
pub fn find_identifier(content: &str, needle: &str) -> Vec<usize> {
    let mut out = Vec::new();
    if needle.is_empty() {
        return out;
    }
    let chars: Vec<(usize, char)> = content.char_indices().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let boundary_before = i == 0 || !is_ident_char(chars[i - 1].1);
        if boundary_before && i + needle_chars.len() <= chars.len() {
            let matches = needle_chars
                .iter()
                .zip(&chars[i..i + needle_chars.len()])
                .all(|(n, (_, c))| n.eq_ignore_ascii_case(c));
            if matches {
                let end = i + needle_chars.len();
                let boundary_after = end == chars.len() || !is_ident_char(chars[end].1);
                if boundary_after {
                    out.push(chars[i].0);
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

/// Line-scan a module for `Procedure`/`Function` headers. The BSL grammar
/// itself is out of scope; this only recovers declaration names and lines.
pub fn scan_method_declarations(content: &str) -> Vec<MethodDecl> {
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        let rest = ["Procedure ", "Function "]
            .iter()
            .find_map(|kw| strip_prefix_ignore_case(trimmed, kw));
        let Some(rest) = rest else {
            continue;
        };
        let name: String = rest
            .chars()
            .take_while(|c| is_ident_char(*c))
            .collect();
        if !name.is_empty() {
            out.push(MethodDecl {
                name,
                line: (i + 1) as u32,
            });
        }
    }
    out
}

// Byte-sliced with a boundary check: module text is frequently non-ASCII
// and prefix.len() may land inside a multibyte character.
fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// Shorten a raw module path for display: drop everything up to and
/// including the corpus-root marker segment, else keep the last three
/// segments.
pub fn display_module_path(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().position(|s| *s == CORPUS_ROOT_MARKER) {
        if pos + 1 < segments.len() {
            return segments[pos + 1..].join("/");
        }
    }
    if segments.len() > 3 {
        segments[segments.len() - 3..].join("/")
    } else {
        segments.join("/")
    }
}

fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        if let Component::Normal(os) = comp {
            parts.push(os.to_string_lossy().to_string());
        }
    }
    parts.join("/")
}
