//! Durable per-language document storage.
//!
//! The engine treats storage as an injected key-value capability rather than
//! an ambient singleton: `KeyValueStore` is the seam, `MemoryStore` backs
//! tests, and `FsStore` persists one file per key under a directory. Keys
//! follow the `editor-code-<language>` scheme; a separate key remembers the
//! active language across restarts. Unknown keys read as `None` and a read
//! miss for a language falls back to that language's default template.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use core_text::LanguageId;

/// Storage key for a language's committed document text.
pub fn code_key(language: LanguageId) -> String {
    format!("editor-code-{}", language.as_str())
}

/// Storage key remembering the most recently selected language.
pub const ACTIVE_LANGUAGE_KEY: &str = "language";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failure for key {key:?}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Injected key-value storage capability. Values are whole document texts;
/// writes are immediate and synchronous (local storage semantics).
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key. Key strings are restricted to
/// the engine's own `[a-z-]` key scheme, so they map directly to file names.
#[derive(Debug)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FsStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        tracing::trace!(target: "storage", key, value_len = value.len(), "persisted");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Starter template used when a language has no stored document yet.
pub fn default_template(language: LanguageId) -> &'static str {
    match language {
        LanguageId::Javascript => {
            "// JavaScript playground\nconst numbers = [1, 2, 3, 4, 5];\nconst doubled = numbers.map((n) => n * 2);\nconsole.log(doubled);\n"
        }
        LanguageId::Typescript => {
            "// TypeScript playground\ninterface Point {\n  x: number;\n  y: number;\n}\n\nconst origin: Point = { x: 0, y: 0 };\nconsole.log(origin);\n"
        }
        LanguageId::Python => {
            "# Python playground\nnumbers = [1, 2, 3, 4, 5]\ndoubled = [n * 2 for n in numbers]\nprint(doubled)\n"
        }
        LanguageId::Rust => {
            "// Rust playground\nfn main() {\n    let numbers = [1, 2, 3, 4, 5];\n    let doubled: Vec<i32> = numbers.iter().map(|n| n * 2).collect();\n    println!(\"{doubled:?}\");\n}\n"
        }
        LanguageId::Go => {
            "// Go playground\npackage main\n\nimport \"fmt\"\n\nfunc main() {\n\tnumbers := []int{1, 2, 3, 4, 5}\n\tfmt.Println(numbers)\n}\n"
        }
    }
}

/// Stored document for `language`, or its default template when nothing has
/// been persisted yet.
pub fn stored_or_default(store: &dyn KeyValueStore, language: LanguageId) -> String {
    match store.get(&code_key(language)) {
        Some(text) => text,
        None => {
            tracing::debug!(
                target: "storage",
                language = language.as_str(),
                "no stored document, using default template"
            );
            default_template(language).to_string()
        }
    }
}

/// Most recently selected language, if one was persisted and still parses.
pub fn stored_language(store: &dyn KeyValueStore) -> Option<LanguageId> {
    store.get(ACTIVE_LANGUAGE_KEY)?.parse().ok()
}
