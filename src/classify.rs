/*!
 * Content classification: renderable text or opaque bytes
 */

use std::path::Path;

use mime_guess::mime::{self, Mime};

/// How a file's content is treated by the document generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Rendered line by line
    Text,
    /// Listed in the tree only
    Opaque,
}

/// Decides whether a file is rendered as text
///
/// Implementations must not open the file; the decision is made from the
/// path alone.
pub trait ContentClassifier: Send + Sync {
    /// Classify the file at `path`
    fn classify(&self, path: &Path) -> ContentClass;
}

/// `application/*` subtypes that are structured text
const TEXTUAL_APPLICATION_SUBTYPES: &[&str] = &[
    "json",
    "xml",
    "javascript",
    "x-javascript",
    "ecmascript",
    "toml",
    "yaml",
    "x-yaml",
    "x-sh",
    "x-csh",
    "sql",
    "x-tex",
    "x-latex",
    "rtf",
    "x-httpd-php",
    "graphql",
];

/// Source extensions the MIME table misses or maps to non-text types
const EXTRA_TEXT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "rs", "toml", "lock", "ini", "cfg", "conf", "gradle", "kt", "kts", "go", "swift",
    "scala", "hs", "ex", "exs", "erl", "zig", "nim", "dart", "vue", "svelte", "proto", "tf", "nix",
    "dockerfile", "gitignore", "editorconfig",
];

/// File names without extension that are conventionally text
const TEXT_FILE_NAMES: &[&str] = &[
    "makefile",
    "dockerfile",
    "containerfile",
    "license",
    "licence",
    "readme",
    "changelog",
    "authors",
    "contributing",
    "gemfile",
    "rakefile",
    "procfile",
    "justfile",
    "vagrantfile",
];

/// Classifier backed by the `mime_guess` extension table
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl MimeClassifier {
    /// Create the classifier
    pub fn new() -> Self {
        Self
    }

    /// Whether a guessed MIME type denotes text
    pub fn is_textual(mime: &Mime) -> bool {
        if mime.type_() == mime::TEXT {
            return true;
        }

        if mime.type_() != mime::APPLICATION {
            return false;
        }

        if let Some(suffix) = mime.suffix() {
            if suffix == mime::JSON || suffix == mime::XML {
                return true;
            }
        }

        TEXTUAL_APPLICATION_SUBTYPES.contains(&mime.subtype().as_str())
    }
}

impl ContentClassifier for MimeClassifier {
    fn classify(&self, path: &Path) -> ContentClass {
        let guess = mime_guess::from_path(path);
        if guess.iter().any(|m| Self::is_textual(&m)) {
            return ContentClass::Text;
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match extension {
            Some(ext) if EXTRA_TEXT_EXTENSIONS.contains(&ext.as_str()) => {
                ContentClass::Text
            }
            None => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if TEXT_FILE_NAMES.contains(&name.as_str()) {
                    ContentClass::Text
                } else {
                    ContentClass::Opaque
                }
            }
            _ => ContentClass::Opaque,
        }
    }
}
