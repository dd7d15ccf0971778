// Input checks and rendering of answers and documents for the terminal


use std::fmt::Write as _;

use console::style;
use tracing::error;

use crate::parsing::{Document, ParsedFile};
use crate::qa::AnswerWithSources;
use crate::{QaError, Result};

const EMPTY_QUERY_MESSAGE: &str = "Please enter a question!";
const UNREADABLE_FILE_MESSAGE: &str = "Cannot read document! Make sure the document has \
selectable text or is not a scanned image.";
const SECTION_RULE: &str = "---";

#[inline]
pub fn is_query_valid(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(QaError::InvalidQuery(EMPTY_QUERY_MESSAGE.to_string()));
    }
    Ok(())
}

/// A file is usable once at least one page has text
#[inline]
pub fn is_file_valid(file: &ParsedFile) -> Result<()> {
    let has_text = file
        .docs
        .iter()
        .any(|doc| !doc.page_content.trim().is_empty());

    if !has_text {
        return Err(QaError::InvalidFile(UNREADABLE_FILE_MESSAGE.to_string()));
    }
    Ok(())
}

/// Report a file that could not be read and move on
#[inline]
pub fn display_file_read_error(err: &QaError, file_name: &str) {
    error!("Error reading {}: {}", file_name, err);
    eprintln!(
        "{} {}",
        style("Error reading file.").red().bold(),
        style("Make sure the file is not corrupted or encrypted").dim()
    );
    eprintln!("  {}: {}", style(file_name).cyan(), err);
}

/// Render pages as simple HTML, one paragraph per line and a rule between pages
#[inline]
pub fn wrap_doc_in_html(docs: &[Document]) -> String {
    docs.iter()
        .map(|doc| {
            doc.page_content
                .lines()
                .map(|line| format!("<p>{}</p>", escape_html(line)))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n<hr/>\n")
}

/// Answer followed by each source excerpt with its key
#[inline]
pub fn render_answer(result: &AnswerWithSources) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Answer");
    let _ = writeln!(out, "{}", result.answer);
    let _ = writeln!(out, "{}", SECTION_RULE);

    if result.sources.is_empty() {
        return out;
    }

    let _ = writeln!(out, "Sources");
    for source in &result.sources {
        let _ = writeln!(out, "{}", source.page_content);
        let _ = writeln!(out, "{}", source_label(source));
        let _ = writeln!(out, "{}", SECTION_RULE);
    }
    out
}

/// Plain text of every page, separated by page headers
#[inline]
pub fn render_document(docs: &[Document]) -> String {
    let mut out = String::new();
    for doc in docs {
        let _ = writeln!(out, "=== Page {} ===", doc.metadata.page);
        let _ = writeln!(out, "{}", doc.page_content);
        let _ = writeln!(out);
    }
    out
}

fn source_label(doc: &Document) -> String {
    match doc.metadata.file_name.as_deref() {
        Some(name) => format!("Source: {} ({})", doc.metadata.source, name),
        None => format!("Source: {}", doc.metadata.source),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
