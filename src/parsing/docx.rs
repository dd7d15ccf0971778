use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the body text of a DOCX archive
pub(super) fn extract_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("DOCX is not a valid zip archive")?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("DOCX is missing {}", DOCUMENT_PART))?
        .read_to_string(&mut xml)
        .context("Failed to read document body")?;

    parse_document_xml(&xml)
}

/// Flatten WordprocessingML into plain text, one line per paragraph
pub(super) fn parse_document_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event().context("Malformed document XML")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            // Tab stops in paragraph properties also use `w:tab`, so only count runs
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => text.push('\t'),
                b"br" | b"cr" if in_run => text.push('\n'),
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                text.push_str(&e.unescape().context("Invalid text in document")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
