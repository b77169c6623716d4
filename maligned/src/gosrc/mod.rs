//! A front end for Go source.
//!
//! This is not a Go compiler. It reads just enough of the language to
//! find struct types and size their fields: the predeclared types,
//! composite types, and named types declared in the same package.
//! Everything else (imported types, generics, constant expressions)
//! comes back unresolved, and the struct using it is skipped.

pub mod lex;
pub mod parse;
pub mod resolve;

use crate::helpe::*;
use self::{
    parse::{ParsedFile, TypeDecl},
    resolve::Resolver,
};

/// One package, as a set of Go files.
#[derive(Debug, Clone)]
pub struct GoSource {
    files: Vec<(Arc<Path>, String)>,
}

impl GoSource {
    /// A single `.go` file, or every `.go` file directly inside a
    /// directory.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let io_err = |source| SourceError::Io { path: path.to_path_buf(), source };
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(io_err)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == "go"))
                .collect();
            paths.sort();
            if paths.is_empty() {
                return Err(SourceError::Empty(path.to_path_buf()));
            }
            paths
        } else {
            vec![path.to_path_buf()]
        };

        let mut files = vec![];
        for p in paths {
            let text = std::fs::read_to_string(&p)
                .map_err(|source| SourceError::Io { path: p.clone(), source })?;
            files.push((Arc::from(p.as_path()), text));
        }
        debug!(path = %path.display(), files = files.len(), "Go sources read.");

        Ok(Self { files })
    }

    /// Source text that did not come from disk. `path` is only used in
    /// positions.
    pub fn from_text(path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        Self {
            files: vec![(Arc::from(path.as_ref()), text.into())],
        }
    }

    /// Adds another file of the same package.
    pub fn with_text(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.files.push((Arc::from(path.as_ref()), text.into()));
        self
    }

    pub fn num_files(&self) -> usize {
        self.files.len()
    }
}

impl RecordSource for GoSource {
    type Pos = SourcePos;

    fn records(&self, sizes: &Sizes) -> Result<Vec<Record<SourcePos>>, SourceError> {
        let mut parsed: Vec<(Arc<Path>, ParsedFile)> = vec![];
        for (path, text) in &self.files {
            let toks = lex::lex(text, path)?;
            parsed.push((path.clone(), parse::parse(&toks, path)?));
        }

        // Declarations are visible across files of the same package.
        // A directory may also hold an external test package.
        let mut scopes: HashMap<&str, IndexMap<String, TypeDecl>> = HashMap::new();
        for (_, f) in &parsed {
            let scope = scopes.entry(f.package.as_str()).or_default();
            for d in &f.decls {
                scope.insert(d.name.clone(), d.clone());
            }
        }

        let mut res = vec![];
        for (path, f) in &parsed {
            let Some(scope) = scopes.get(f.package.as_str()) else { continue; };
            let resolver = Resolver::new(scope, &sizes.abi);
            for site in &f.structs {
                res.push(Record {
                    descriptor: resolver.resolve_fields(&site.fields, &site.params, &site.locals),
                    position:   SourcePos {
                        path:   path.clone(),
                        line:   site.line,
                        column: site.column,
                    },
                    name:       site.name.clone(),
                });
            }
        }
        info!(files = parsed.len(), records = res.len(), "Struct types collected.");

        Ok(res)
    }
}
