use crate::parsing::Document;

/// Marker the model is told to put before its citations
pub const SOURCES_MARKER: &str = "SOURCES:";

pub const STUFF_SYSTEM_PROMPT: &str = "\
Create a final answer to the given question using the provided document \
excerpts (given in no particular order) as sources. \
ALWAYS end your answer with a line starting with \"SOURCES:\" that lists, \
separated by commas, only the minimal set of source keys needed to answer \
the question. \
If you are unable to answer the question, say that you do not have enough \
information to answer it and leave the SOURCES line empty. \
Use only the provided excerpts and never fabricate an answer.";

/// One retrieved excerpt in the form the model cites from
#[inline]
pub fn format_document(document: &Document) -> String {
    format!(
        "Content: {}\nSource: {}",
        document.page_content, document.metadata.source
    )
}

/// The user turn: question followed by all excerpts stuffed inline
#[inline]
pub fn stuff_prompt(question: &str, documents: &[Document]) -> String {
    let summaries = documents
        .iter()
        .map(format_document)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "QUESTION: {}\n=========\n{}\n=========\nFINAL ANSWER:",
        question.trim(),
        summaries
    )
}
