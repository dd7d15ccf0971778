use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings::{ChunkedFile, FolderIndex, check_embedder};
use crate::library::{Catalog, IndexOutcome, Library};
use crate::llm::{ChatModel, get_llm, validate_openai_key};
use crate::parsing::{FileKind, ParsedFile, read_path};
use crate::qa::query_folder;
use crate::ui::{display_file_read_error, render_answer, render_document, wrap_doc_in_html};

const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

/// Options for answering a single question
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub model: Option<String>,
    pub return_all: bool,
    pub show_full_doc: bool,
}

/// Parse, validate, chunk and index a file or every supported file in a directory
#[inline]
pub async fn ingest(config: Config, path: &Path) -> Result<()> {
    let library = open_library(config).await?;

    let paths = collect_paths(path)?;
    if paths.is_empty() {
        bail!("No .pdf, .docx or .txt files found in {}", path.display());
    }

    let mut indexed = 0_usize;
    let mut cached = 0_usize;
    let mut failed = 0_usize;

    for file_path in &paths {
        let file = match read_path(file_path) {
            Ok(file) => file,
            Err(e) => {
                display_file_read_error(&e, &file_path.display().to_string());
                failed += 1;
                continue;
            }
        };

        match index_with_spinner(&library, &file).await {
            Ok(outcome) => {
                if outcome.cache_hit {
                    cached += 1;
                    println!(
                        "✓ {} already indexed (ID: {}, {} chunks)",
                        outcome.record.name,
                        short_id(&outcome.record.id),
                        outcome.record.chunk_count
                    );
                } else {
                    indexed += 1;
                    println!(
                        "✓ Indexed {} (ID: {}, {} pages, {} chunks)",
                        outcome.record.name,
                        short_id(&outcome.record.id),
                        outcome.record.page_count,
                        outcome.record.chunk_count
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", style("✗").red(), file.name, e);
            }
        }
    }

    if paths.len() > 1 {
        println!();
        println!("Summary:");
        println!("  Indexed: {}", indexed);
        println!("  Already indexed: {}", cached);
        println!("  Failed: {}", failed);
    }

    if failed == paths.len() {
        bail!("No documents could be indexed");
    }
    Ok(())
}

/// Answer one question about a document
#[inline]
pub async fn ask(config: Config, document: &str, question: &str, options: AskOptions) -> Result<()> {
    let model = options
        .model
        .unwrap_or_else(|| config.llm.default_model.clone());
    validate_openai_key(&config, &model)?;
    let llm = get_llm(&config, &model, config.llm.temperature)?;

    let library = open_library(config).await?;
    let (files, folder_index) = prepare_folder(&library, document).await?;

    if options.show_full_doc {
        for file in &files {
            println!("{}", style(&file.name).bold());
            println!("{}", render_document(&file.docs));
        }
    }

    answer(&library, &folder_index, llm.as_ref(), question, options.return_all).await
}

/// Index a document once, then answer questions until an empty line or `exit`
#[inline]
pub async fn chat(
    config: Config,
    document: &str,
    model: Option<String>,
    return_all: bool,
) -> Result<()> {
    let model = model.unwrap_or_else(|| config.llm.default_model.clone());
    validate_openai_key(&config, &model)?;
    let llm = get_llm(&config, &model, config.llm.temperature)?;

    let library = open_library(config).await?;
    let (files, folder_index) = prepare_folder(&library, document).await?;

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    eprintln!(
        "{} {} with {}. Empty line or 'exit' to quit.",
        style("Chatting about").bold(),
        style(names.join(", ")).cyan(),
        style(llm.model()).cyan()
    );

    // Piped input is read line by line instead of prompting
    let mut piped_lines = (!console::user_attended()).then(|| std::io::stdin().lines());

    loop {
        let question = match piped_lines.as_mut() {
            Some(lines) => match lines.next() {
                Some(line) => line.context("Failed to read question")?,
                None => break,
            },
            None => Input::<String>::new()
                .with_prompt("Question")
                .allow_empty(true)
                .interact_text()
                .context("Failed to read question")?,
        };

        let question = question.trim();
        if question.is_empty() || EXIT_COMMANDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        if let Err(e) = answer(&library, &folder_index, llm.as_ref(), question, return_all).await {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
        }
    }

    Ok(())
}

/// List indexed documents
#[inline]
pub async fn list_documents(config: Config) -> Result<()> {
    let catalog = Catalog::open(config)
        .await
        .context("Failed to open document library")?;
    let documents = catalog.list().await?;

    if documents.is_empty() {
        println!("No documents have been indexed yet.");
        println!("Use 'docqa ingest <path>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!("📄 {} (ID: {})", document.name, short_id(&document.id));
        println!("   Type: {}", document.kind);
        println!("   Size: {} bytes", document.size_bytes);
        println!("   Status: {}", document.status);
        println!(
            "   Pages: {}, Chunks: {}",
            document.page_count, document.chunk_count
        );
        if let Some(signature) = &document.embedding_signature {
            println!(
                "   Embeddings: {} (chunk size {}, overlap {})",
                signature, document.chunk_size, document.chunk_overlap
            );
        }
        println!(
            "   Added: {}",
            document.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(indexed) = document.indexed_date {
            println!("   Indexed: {}", indexed.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(error) = &document.error_message {
            println!("   ⚠️  Error: {}", error);
        }
        println!();
    }

    let completed = documents.iter().filter(|d| d.is_completed()).count();
    let failed = documents.iter().filter(|d| d.is_failed()).count();
    println!("Summary:");
    println!("  Total Documents: {}", documents.len());
    println!("  Completed: {}", completed);
    println!("  Failed: {}", failed);

    Ok(())
}

/// Print the full parsed text of a document
#[inline]
pub async fn show_document(config: Config, document: &str, html: bool) -> Result<()> {
    let pages = if Path::new(document).is_file() {
        read_path(document)?.docs
    } else {
        let catalog = Catalog::open(config)
            .await
            .context("Failed to open document library")?;
        catalog.load(document).await?.file.docs
    };

    if html {
        println!("{}", wrap_doc_in_html(&pages));
    } else {
        print!("{}", render_document(&pages));
    }
    Ok(())
}

/// Delete a document's metadata and vectors
#[inline]
pub async fn remove_document(config: Config, document: &str) -> Result<()> {
    let catalog = Catalog::open(config)
        .await
        .context("Failed to open document library")?;
    let removed = catalog.remove(document).await?;

    println!("Document removed: {} (ID: {})", removed.name, short_id(&removed.id));
    println!("✓ Metadata, pages and chunks deleted");
    println!("✓ Vector embeddings deleted");
    Ok(())
}

async fn answer(
    library: &Library,
    folder_index: &FolderIndex,
    llm: &dyn ChatModel,
    question: &str,
    return_all: bool,
) -> Result<()> {
    let result = query_folder(
        folder_index,
        library.embedder(),
        question,
        return_all,
        llm,
        library.config().retrieval.top_k,
    )
    .await?;

    print!("{}", render_answer(&result));
    Ok(())
}

/// Resolve `document` to indexed files plus the search scope over them.
///
/// A path to a file or directory is read and indexed; anything else is
/// looked up in the library by id, id prefix or name.
async fn prepare_folder(
    library: &Library,
    document: &str,
) -> Result<(Vec<ParsedFile>, FolderIndex)> {
    let path = Path::new(document);
    let files: Vec<ParsedFile> = if path.exists() {
        let mut files = Vec::new();
        for file_path in collect_paths(path)? {
            match read_path(&file_path) {
                Ok(file) => files.push(file),
                Err(e) => display_file_read_error(&e, &file_path.display().to_string()),
            }
        }
        files
    } else {
        vec![library.load(document).await?.file]
    };

    if files.is_empty() {
        bail!("No readable documents found for {}", document);
    }

    let mut chunked: Vec<ChunkedFile> = Vec::with_capacity(files.len());
    for file in &files {
        let outcome = index_with_spinner(library, file).await?;
        chunked.push(outcome.file);
    }

    info!(
        "Answering over {} files ({} chunks)",
        chunked.len(),
        chunked.iter().map(|f| f.docs.len()).sum::<usize>()
    );
    let folder_index = library.folder_index(chunked);
    Ok((files, folder_index))
}

/// Open the library after making sure the embedding provider can serve requests
async fn open_library(config: Config) -> Result<Library> {
    check_embedder(&config).context("Embedding provider is not ready")?;
    Library::open(config)
        .await
        .context("Failed to open document library")
}

async fn index_with_spinner(library: &Library, file: &ParsedFile) -> Result<IndexOutcome> {
    let spinner = if console::user_attended_stderr() {
        let spinner = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(format!("Indexing {}", file.name));

    let outcome = library.index_file(file).await;
    spinner.finish_and_clear();

    Ok(outcome?)
}

/// The file itself, or the supported files directly inside a directory
fn collect_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry_path = entry?.path();
        let supported = entry_path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| FileKind::from_file_name(name).is_ok());

        if entry_path.is_file() && supported {
            paths.push(entry_path);
        } else {
            warn!("Skipping {}", entry_path.display());
        }
    }

    paths.sort();
    Ok(paths)
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn collect_paths_filters_directory() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        fs::write(temp_dir.path().join("b.txt"), "two").expect("write");
        fs::write(temp_dir.path().join("a.pdf"), "one").expect("write");
        fs::write(temp_dir.path().join("budget.xlsx"), "skip").expect("write");
        fs::create_dir(temp_dir.path().join("nested.txt")).expect("mkdir");

        let paths = collect_paths(temp_dir.path()).expect("should list");
        let names: Vec<String> = paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn collect_paths_passes_files_through() {
        let paths = collect_paths(Path::new("report.docx")).expect("should list");
        assert_eq!(paths, vec![PathBuf::from("report.docx")]);
    }

    #[test]
    fn short_id_truncates() {
        assert_eq!(short_id("0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }
}
