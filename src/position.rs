//! Best-effort resolution of opaque module locations into 1-based lines.
//!
//! Exact resolution loads the owning module and consults a line-offset
//! index. When that fails, or when the address is a legacy fragment token,
//! resolution degrades to line 0 instead of aborting the query. Fragment
//! tokens of the `proc=N` form carry only an enclosing-method ordinal; the
//! ordinal-to-line mapping of that addressing scheme is not recoverable
//! here, so those stay at line 0 (see DESIGN.md).

use crate::corpus::CorpusIndex;
use crate::model::{CorpusOccurrence, FragmentAddress};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Byte-offset to 1-based line index for one module's text.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => (idx + 1) as u32,
            Err(idx) => idx as u32,
        }
    }
}

pub struct PositionResolver<'a> {
    corpus: &'a dyn CorpusIndex,
    // Queries touch the same module many times; index each once.
    cache: RefCell<HashMap<String, Rc<LineIndex>>>,
}

impl<'a> PositionResolver<'a> {
    pub fn new(corpus: &'a dyn CorpusIndex) -> Self {
        Self {
            corpus,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve an occurrence to a 1-based line, 0 when unresolvable.
    pub fn resolve(&self, occurrence: &CorpusOccurrence) -> u32 {
        match &occurrence.address {
            FragmentAddress::Offset(offset) => {
                self.line_at(&occurrence.module_path, *offset)
            }
            FragmentAddress::Fragment(token) => {
                self.resolve_fragment(&occurrence.module_path, token)
            }
        }
    }

    fn line_at(&self, module_path: &str, offset: usize) -> u32 {
        match self.line_index(module_path) {
            Ok(index) => index.line_of(offset),
            Err(err) => {
                eprintln!("mdxref: position: {module_path}: {err}");
                0
            }
        }
    }

    fn line_index(&self, module_path: &str) -> Result<Rc<LineIndex>, crate::error::QueryError> {
        if let Some(index) = self.cache.borrow().get(module_path) {
            return Ok(Rc::clone(index));
        }
        let content = self.corpus.load_module(module_path)?;
        let index = Rc::new(LineIndex::new(&content));
        self.cache
            .borrow_mut()
            .insert(module_path.to_string(), Rc::clone(&index));
        Ok(index)
    }

    /// Fragment tokens: `off=N` addresses a byte offset and resolves
    /// exactly; `proc=N` names an enclosing-method ordinal whose line
    /// cannot be recovered and resolves to 0. Anything else is unknown.
    fn resolve_fragment(&self, module_path: &str, token: &str) -> u32 {
        for part in token.split(&['#', ';'][..]) {
            if let Some(raw) = part.strip_prefix("off=") {
                if let Ok(offset) = raw.parse::<usize>() {
                    return self.line_at(module_path, offset);
                }
            }
            if let Some(raw) = part.strip_prefix("proc=") {
                if raw.parse::<usize>().is_ok() {
                    // Enclosing-method ordinal only; approximate scheme.
                    return 0;
                }
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::model::MethodDecl;

    struct OneModule {
        path: String,
        content: String,
    }

    impl CorpusIndex for OneModule {
        fn find_occurrences(
            &self,
            _identifiers: &[String],
        ) -> Result<Box<dyn Iterator<Item = CorpusOccurrence> + '_>, QueryError> {
            Ok(Box::new(std::iter::empty()))
        }

        fn load_module(&self, module_path: &str) -> Result<String, QueryError> {
            if module_path == self.path {
                Ok(self.content.clone())
            } else {
                Err(QueryError::ModuleNotFound {
                    path: module_path.to_string(),
                })
            }
        }

        fn module_methods(&self, _module_path: &str) -> Result<Vec<MethodDecl>, QueryError> {
            Ok(Vec::new())
        }
    }

    fn corpus() -> OneModule {
        OneModule {
            path: "CommonModules/Utils/Module.bsl".to_string(),
            content: "first line\nsecond line\nthird line\n".to_string(),
        }
    }

    #[test]
    fn line_index_maps_offsets() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 1);
        assert_eq!(index.line_of(3), 2);
        assert_eq!(index.line_of(7), 3);
    }

    #[test]
    fn resolves_offsets_to_lines() {
        let corpus = corpus();
        let resolver = PositionResolver::new(&corpus);
        let occurrence = CorpusOccurrence {
            module_path: corpus.path.clone(),
            address: FragmentAddress::Offset(11),
        };
        assert_eq!(resolver.resolve(&occurrence), 2);
    }

    #[test]
    fn missing_module_degrades_to_zero() {
        let corpus = corpus();
        let resolver = PositionResolver::new(&corpus);
        let occurrence = CorpusOccurrence {
            module_path: "CommonModules/Gone/Module.bsl".to_string(),
            address: FragmentAddress::Offset(5),
        };
        assert_eq!(resolver.resolve(&occurrence), 0);
    }

    #[test]
    fn fragment_offset_resolves_ordinal_does_not() {
        let corpus = corpus();
        let resolver = PositionResolver::new(&corpus);
        let exact = CorpusOccurrence {
            module_path: corpus.path.clone(),
            address: FragmentAddress::Fragment("off=12".to_string()),
        };
        assert_eq!(resolver.resolve(&exact), 2);

        let ordinal = CorpusOccurrence {
            module_path: corpus.path.clone(),
            address: FragmentAddress::Fragment("proc=3".to_string()),
        };
        assert_eq!(resolver.resolve(&ordinal), 0);

        let garbage = CorpusOccurrence {
            module_path: corpus.path.clone(),
            address: FragmentAddress::Fragment("???".to_string()),
        };
        assert_eq!(resolver.resolve(&garbage), 0);
    }
}
