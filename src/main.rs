use clap::{Parser, Subcommand};
use console::style;
use docqa::commands::{
    AskOptions, ask, chat, ingest, list_documents, remove_document, show_document,
};
use docqa::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about PDF, DOCX and TXT documents and get answers with sources")]
#[command(version)]
struct Cli {
    /// Configuration and data directory (defaults to ~/.docqa)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure providers, models and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Parse, chunk and index a document or a directory of documents
    Ingest {
        /// Path to a .pdf, .docx or .txt file, or a directory containing them
        path: PathBuf,
    },
    /// Answer a question about a document
    Ask {
        /// Document path, or the ID, ID prefix or name of an indexed document
        document: String,
        /// The question to answer
        question: String,
        /// Chat model, e.g. "gpt-4", "ollama/llama3" or "debug"
        #[arg(long)]
        model: Option<String>,
        /// Show every retrieved chunk instead of only the cited ones
        #[arg(long)]
        return_all: bool,
        /// Print the full parsed document before answering
        #[arg(long)]
        show_full_doc: bool,
    },
    /// Ask several questions about a document interactively
    Chat {
        /// Document path, or the ID, ID prefix or name of an indexed document
        document: String,
        /// Chat model, e.g. "gpt-4", "ollama/llama3" or "debug"
        #[arg(long)]
        model: Option<String>,
        /// Show every retrieved chunk instead of only the cited ones
        #[arg(long)]
        return_all: bool,
    },
    /// List indexed documents
    List,
    /// Print the full parsed text of a document
    Show {
        /// Document path, or the ID, ID prefix or name of an indexed document
        document: String,
        /// Render as HTML
        #[arg(long)]
        html: bool,
    },
    /// Delete an indexed document and its vectors
    Remove {
        /// ID, ID prefix or name of an indexed document
        document: String,
    },
}

fn load_config(config_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    match config_dir {
        Some(dir) => Config::load_from(dir),
        None => Config::load(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&load_config(cli.config_dir)?);
            } else {
                let config_dir = match cli.config_dir {
                    Some(dir) => dir,
                    None => Config::config_dir()?,
                };
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { path } => {
            ingest(load_config(cli.config_dir)?, &path).await?;
        }
        Commands::Ask {
            document,
            question,
            model,
            return_all,
            show_full_doc,
        } => {
            let options = AskOptions {
                model,
                return_all,
                show_full_doc,
            };
            ask(load_config(cli.config_dir)?, &document, &question, options).await?;
        }
        Commands::Chat {
            document,
            model,
            return_all,
        } => {
            chat(load_config(cli.config_dir)?, &document, model, return_all).await?;
        }
        Commands::List => {
            list_documents(load_config(cli.config_dir)?).await?;
        }
        Commands::Show { document, html } => {
            show_document(load_config(cli.config_dir)?, &document, html).await?;
        }
        Commands::Remove { document } => {
            remove_document(load_config(cli.config_dir)?, &document).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["docqa", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::List));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn ingest_command_with_path() {
        let cli = Cli::try_parse_from(["docqa", "ingest", "papers/attention.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli
            && let Commands::Ingest { path } = parsed.command
        {
            assert_eq!(path, PathBuf::from("papers/attention.pdf"));
        }
    }

    #[test]
    fn ask_command_defaults() {
        let cli = Cli::try_parse_from(["docqa", "ask", "report.pdf", "What was revenue?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli
            && let Commands::Ask {
                document,
                question,
                model,
                return_all,
                show_full_doc,
            } = parsed.command
        {
            assert_eq!(document, "report.pdf");
            assert_eq!(question, "What was revenue?");
            assert_eq!(model, None);
            assert!(!return_all);
            assert!(!show_full_doc);
        }
    }

    #[test]
    fn ask_command_with_flags() {
        let cli = Cli::try_parse_from([
            "docqa",
            "ask",
            "3f2a9c",
            "Summarize",
            "--model",
            "gpt-3.5-turbo",
            "--return-all",
            "--show-full-doc",
            "--config-dir",
            "/tmp/docqa",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/docqa")));
            if let Commands::Ask {
                model,
                return_all,
                show_full_doc,
                ..
            } = parsed.command
            {
                assert_eq!(model.as_deref(), Some("gpt-3.5-turbo"));
                assert!(return_all);
                assert!(show_full_doc);
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["docqa", "ask", "report.pdf"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn show_html_flag() {
        let cli = Cli::try_parse_from(["docqa", "show", "report.pdf", "--html"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli
            && let Commands::Show { document, html } = parsed.command
        {
            assert_eq!(document, "report.pdf");
            assert!(html);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docqa", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli
            && let Commands::Config { show } = parsed.command
        {
            assert!(show);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docqa", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docqa", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
