/*!
 * Paginated document model and output sinks
 *
 * A sink receives pages in order and produces the artifact on `finalize`.
 * Every sink writes into a temporary file next to the destination and only
 * renames it into place when finalized, so a run that is cancelled or fails
 * never leaves a half-written document behind. The temporary file is opened
 * on the first written page.
 */

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, TreeDocError};

/// Separator between pages in the plain-text format
pub const PAGE_BREAK: char = '\u{0C}';

/// Suffix appended to the header of continuation pages
pub const CONTINUED_SUFFIX: &str = " (continued)";

/// What a page holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Title and generation metadata
    Title,
    /// Part of the rendered directory tree
    Tree,
    /// Part of one file's content
    FileContent,
}

impl PageKind {
    /// Stable name used in serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Title => "title",
            PageKind::Tree => "tree",
            PageKind::FileContent => "file_content",
        }
    }
}

/// One page of plain text lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Page kind
    pub kind: PageKind,
    /// Header line (file path for content pages, title for the title page)
    pub header: Option<String>,
    /// Body lines
    pub lines: Vec<String>,
}

/// Ordered pages of a document
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaginatedDocument {
    /// Pages in output order
    pub pages: Vec<Page>,
}

/// Splits long sections into pages of bounded length
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    lines_per_page: usize,
}

impl Paginator {
    /// Default number of body lines per page
    pub const DEFAULT_LINES_PER_PAGE: usize = 60;

    /// Create a paginator; a zero page size is treated as one line
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }

    /// Split a section into pages; an empty section still yields one page
    pub fn paginate(
        &self,
        kind: PageKind,
        header: Option<String>,
        lines: Vec<String>,
    ) -> Vec<Page> {
        if lines.is_empty() {
            return vec![Page {
                kind,
                header,
                lines,
            }];
        }

        lines
            .chunks(self.lines_per_page)
            .enumerate()
            .map(|(i, chunk)| Page {
                kind,
                header: match (&header, i) {
                    (Some(h), 0) => Some(h.clone()),
                    (Some(h), _) => Some(format!("{}{}", h, CONTINUED_SUFFIX)),
                    (None, _) => None,
                },
                lines: chunk.to_vec(),
            })
            .collect()
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LINES_PER_PAGE)
    }
}

/// Destination for the pages of one generation run
pub trait DocumentSink: Send {
    /// Append the next page
    fn push_page(&mut self, page: Page) -> Result<()>;

    /// Pages accepted so far
    fn page_count(&self) -> usize;

    /// Write the artifact to its destination; consumes the sink
    fn finalize(self: Box<Self>) -> Result<PathBuf>;
}

/// Output format of the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// XML with one `<page>` element per page
    #[default]
    Xml,
    /// Plain text, pages separated by form feeds
    Text,
    /// JSON array of pages
    Json,
}

impl OutputFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }

    /// Open a sink of this format writing to `destination`
    pub fn create_sink(&self, destination: &Path) -> Result<Box<dyn DocumentSink>> {
        Ok(match self {
            OutputFormat::Xml => Box::new(XmlDocumentSink::create(destination)?),
            OutputFormat::Text => Box::new(TextDocumentSink::create(destination)?),
            OutputFormat::Json => Box::new(JsonDocumentSink::create(destination)?),
        })
    }
}

/// Temporary file that becomes the destination on commit
///
/// The file is opened on the first write, so it does not exist while the
/// tree that may contain the destination is being scanned.
struct AtomicOutput {
    destination: PathBuf,
    parent: PathBuf,
    writer: Option<BufWriter<NamedTempFile>>,
}

impl AtomicOutput {
    fn create(destination: &Path) -> Result<Self> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let metadata =
            fs::metadata(&parent).map_err(|e| TreeDocError::destination(destination, e))?;
        if !metadata.is_dir() {
            return Err(TreeDocError::destination(
                destination,
                io::Error::new(io::ErrorKind::Other, "parent is not a directory"),
            ));
        }

        Ok(Self {
            destination: destination.to_path_buf(),
            parent,
            writer: None,
        })
    }

    fn writer(&mut self) -> Result<&mut BufWriter<NamedTempFile>> {
        if self.writer.is_none() {
            let temp = NamedTempFile::new_in(&self.parent)
                .map_err(|e| TreeDocError::destination(&self.destination, e))?;
            self.writer = Some(BufWriter::new(temp));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| TreeDocError::Unexpected("output file not open".to_string()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let result = self.writer()?.write_all(bytes);
        result.map_err(|e| self.io_error(e))
    }

    fn commit(mut self) -> Result<PathBuf> {
        self.writer()?;
        let writer = self
            .writer
            .take()
            .ok_or_else(|| TreeDocError::Unexpected("output file not open".to_string()))?;
        let temp = writer
            .into_inner()
            .map_err(|e| TreeDocError::destination(&self.destination, e.into_error()))?;
        temp.persist(&self.destination)
            .map_err(|e| TreeDocError::destination(&self.destination, e.error))?;
        Ok(self.destination)
    }

    fn io_error(&self, e: io::Error) -> TreeDocError {
        TreeDocError::destination(&self.destination, e)
    }
}

/// Streams pages as XML elements
pub struct XmlDocumentSink {
    output: Option<AtomicOutput>,
    xml: Writer<Vec<u8>>,
    pages: usize,
}

impl XmlDocumentSink {
    /// Open a sink writing to `destination`
    pub fn create(destination: &Path) -> Result<Self> {
        let mut sink = Self {
            output: Some(AtomicOutput::create(destination)?),
            xml: Writer::new_with_indent(Vec::new(), b' ', 2),
            pages: 0,
        };

        sink.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| sink.io_error(e))?;
        sink.xml
            .write_event(Event::Start(BytesStart::new("document")))
            .map_err(|e| sink.io_error(e))?;

        Ok(sink)
    }

    fn io_error(&self, e: io::Error) -> TreeDocError {
        match &self.output {
            Some(output) => output.io_error(e),
            None => TreeDocError::Io(e),
        }
    }

    /// Move serialized bytes from the XML buffer to the temp file
    fn flush_buffer(&mut self) -> Result<()> {
        let bytes = std::mem::take(self.xml.get_mut());
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| TreeDocError::Unexpected("XML sink already finalized".to_string()))?;
        output.write_all(&bytes)
    }

    fn write_page(&mut self, page: &Page) -> io::Result<()> {
        let number = (self.pages + 1).to_string();
        let mut start = BytesStart::new("page");
        start.push_attribute(("number", number.as_str()));
        start.push_attribute(("kind", page.kind.as_str()));
        self.xml.write_event(Event::Start(start))?;

        if let Some(header) = &page.header {
            self.write_text_element("header", header)?;
        }
        for line in &page.lines {
            self.write_text_element("line", line)?;
        }

        self.xml.write_event(Event::End(BytesEnd::new("page")))
    }

    fn write_text_element(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.xml.write_event(Event::Start(BytesStart::new(name)))?;
        if !text.is_empty() {
            self.xml.write_event(Event::Text(BytesText::new(text)))?;
        }
        self.xml.write_event(Event::End(BytesEnd::new(name)))
    }
}

impl DocumentSink for XmlDocumentSink {
    fn push_page(&mut self, page: Page) -> Result<()> {
        self.write_page(&page).map_err(|e| self.io_error(e))?;
        self.pages += 1;
        self.flush_buffer()
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn finalize(mut self: Box<Self>) -> Result<PathBuf> {
        self.xml
            .write_event(Event::End(BytesEnd::new("document")))
            .map_err(|e| self.io_error(e))?;
        self.xml.get_mut().push(b'\n');
        self.flush_buffer()?;

        let output = self
            .output
            .take()
            .ok_or_else(|| TreeDocError::Unexpected("XML sink already finalized".to_string()))?;
        output.commit()
    }
}

/// Streams pages as plain text separated by form feeds
pub struct TextDocumentSink {
    output: AtomicOutput,
    pages: usize,
}

impl TextDocumentSink {
    /// Open a sink writing to `destination`
    pub fn create(destination: &Path) -> Result<Self> {
        Ok(Self {
            output: AtomicOutput::create(destination)?,
            pages: 0,
        })
    }

    fn render_page(&self, page: &Page) -> io::Result<Vec<u8>> {
        let mut w = Vec::new();
        if self.pages > 0 {
            writeln!(w, "{}", PAGE_BREAK)?;
        }
        if let Some(header) = &page.header {
            writeln!(w, "{}", header)?;
            writeln!(w, "{}", "=".repeat(header.chars().count().max(3)))?;
        }
        for line in &page.lines {
            writeln!(w, "{}", line)?;
        }
        Ok(w)
    }
}

impl DocumentSink for TextDocumentSink {
    fn push_page(&mut self, page: Page) -> Result<()> {
        let bytes = self
            .render_page(&page)
            .map_err(|e| self.output.io_error(e))?;
        self.output.write_all(&bytes)?;
        self.pages += 1;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn finalize(self: Box<Self>) -> Result<PathBuf> {
        self.output.commit()
    }
}

/// Buffers pages and writes them as one JSON document
pub struct JsonDocumentSink {
    output: AtomicOutput,
    document: PaginatedDocument,
}

impl JsonDocumentSink {
    /// Open a sink writing to `destination`
    pub fn create(destination: &Path) -> Result<Self> {
        Ok(Self {
            output: AtomicOutput::create(destination)?,
            document: PaginatedDocument::default(),
        })
    }
}

impl DocumentSink for JsonDocumentSink {
    fn push_page(&mut self, page: Page) -> Result<()> {
        self.document.pages.push(page);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.document.pages.len()
    }

    fn finalize(mut self: Box<Self>) -> Result<PathBuf> {
        let mut bytes = serde_json::to_vec_pretty(&self.document)?;
        bytes.push(b'\n');
        self.output.write_all(&bytes)?;
        self.output.commit()
    }
}

/// Split a plain-text artifact back into its pages
pub fn split_text_pages(content: &str) -> Vec<Vec<&str>> {
    let separator = format!("{}\n", PAGE_BREAK);
    content
        .split(separator.as_str())
        .map(|page| page.lines().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn page(kind: PageKind, header: Option<&str>, lines: &[&str]) -> Page {
        Page {
            kind,
            header: header.map(String::from),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_paginate_splits_and_marks_continuations() {
        let paginator = Paginator::new(2);
        let lines: Vec<String> = ["1", "2", "3", "4", "5"].iter().map(|s| s.to_string()).collect();
        let pages = paginator.paginate(PageKind::FileContent, Some("src/a.rs".into()), lines);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].header.as_deref(), Some("src/a.rs"));
        assert_eq!(pages[1].header.as_deref(), Some("src/a.rs (continued)"));
        assert_eq!(pages[2].lines, vec!["5".to_string()]);
    }

    #[test]
    fn test_paginate_empty_section() {
        let pages =
            Paginator::default().paginate(PageKind::FileContent, Some("empty.txt".into()), vec![]);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn test_text_sink_round_trip() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.txt");

        let mut sink: Box<dyn DocumentSink> = Box::new(TextDocumentSink::create(&dest).unwrap());
        sink.push_page(page(PageKind::Title, Some("demo"), &["Generated: now"])).unwrap();
        sink.push_page(page(PageKind::Tree, None, &["demo", "a.txt"])).unwrap();
        assert_eq!(sink.page_count(), 2);
        // Nothing visible before finalize
        assert!(!dest.exists());

        let written = sink.finalize().unwrap();
        assert_eq!(written, dest);

        let content = fs::read_to_string(&dest).unwrap();
        let pages = split_text_pages(&content);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], vec!["demo", "====", "Generated: now"]);
        assert_eq!(pages[1], vec!["demo", "a.txt"]);
    }

    #[test]
    fn test_xml_sink_escapes_and_counts_pages() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.xml");

        let mut sink = Box::new(XmlDocumentSink::create(&dest).unwrap());
        sink.push_page(page(PageKind::FileContent, Some("a.html"), &["<b>&</b>", ""])).unwrap();
        sink.finalize().unwrap();

        let xml = fs::read_to_string(&dest).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<page number="1" kind="file_content">"#));
        assert!(xml.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(xml.trim_end().ends_with("</document>"));
    }

    #[test]
    fn test_json_sink() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.json");

        let mut sink = OutputFormat::Json.create_sink(&dest).unwrap();
        sink.push_page(page(PageKind::Tree, None, &["root"])).unwrap();
        sink.finalize().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(value["pages"][0]["kind"], "tree");
        assert_eq!(value["pages"][0]["lines"][0], "root");
    }

    #[test]
    fn test_dropped_sink_leaves_no_artifact() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.xml");

        let mut sink = OutputFormat::Xml.create_sink(&dest).unwrap();
        sink.push_page(page(PageKind::Title, Some("t"), &[])).unwrap();
        drop(sink);

        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_file_appears_with_first_page() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.txt");

        let mut sink = OutputFormat::Text.create_sink(&dest).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        sink.push_page(page(PageKind::Title, Some("t"), &["x"])).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        sink.finalize().unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.txt")]);
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("out.txt");
        let err = OutputFormat::Text.create_sink(&dest).err().unwrap();
        assert!(matches!(err, TreeDocError::DestinationUnwritable { .. }));
    }
}
