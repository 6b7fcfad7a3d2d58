// ScholarFlow: a personal research paper catalog.
// Papers are classified by Gemini (or a local Ollama model) and kept in a JSON snapshot.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use scholarflow::config::{Provider, Settings, DEFAULT_LANGUAGE, DEFAULT_OLLAMA_URL, DEFAULT_WEB_PORT};
use scholarflow::query::{self, ALL_CATEGORIES};
use scholarflow::web::{self, AppState};
use scholarflow::{ImageAttachment, IntakeDesk, IntakeError, Paper, PaperDraft, Removal};

// CL arguments for config
#[derive(Parser, Debug)]
#[command(author, version, about = "Research paper catalog with AI-assisted intake", long_about = None)]
struct Args {
    #[arg(long, env = "SCHOLARFLOW_DATA_DIR", default_value = ".", global = true)]
    data_dir: PathBuf,

    #[arg(long, env = "SCHOLARFLOW_PROVIDER", value_enum, default_value = "gemini", global = true)]
    provider: Provider,

    #[arg(long, env = "SCHOLARFLOW_MODEL", global = true)]
    model: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    ollama_url: String,

    #[arg(long, env = "SCHOLARFLOW_LANGUAGE", default_value = DEFAULT_LANGUAGE, global = true)]
    language: String,

    #[arg(long, default_value_t = false, global = true)]
    no_ai: bool,

    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a paper and let the model fill in title, authors, category and tags
    Add {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long, default_value = "")]
        authors: String,

        #[arg(long = "abstract", default_value = "")]
        abstract_text: String,

        #[arg(short, long, default_value = "")]
        url: String,

        /// Screenshot of the paper sent along with the text
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// List papers, newest first
    List {
        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(short, long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Show a single paper
    Show { id: Uuid },
    /// List the categories present in the library
    Categories,
    /// Category statistics
    Stats,
    /// Delete a paper
    Remove {
        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Start the web interface
    Serve {
        #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
        port: u16,
    },
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            provider: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            ollama_url: self.ollama_url.clone(),
            language: self.language.clone(),
            no_ai: self.no_ai,
        }
    }
}

fn init_tracing(verbose: bool, serving: bool) {
    let default = match (verbose, serving) {
        (true, _) => "scholarflow=debug,info",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn rule() {
    println!("{}", "=".repeat(64));
}

fn print_card(paper: &Paper) {
    rule();
    println!("[{}] {}", paper.category, paper.title);
    rule();
    println!("Authors: {}", paper.authors_or_unknown());
    if let Some(summary) = &paper.ai_summary {
        println!("AI summary: {}", summary);
    }
    if !paper.tags.is_empty() {
        let tags: Vec<String> = paper.tags.iter().map(|t| format!("#{}", t)).collect();
        println!("Tags: {}", tags.join(" "));
    }
    if !paper.url.is_empty() {
        println!("URL: {}", paper.url);
    }
    println!(
        "Added: {}",
        paper.date_added.with_timezone(&chrono::Local).format("%Y-%m-%d")
    );
    println!("ID: {}\n", paper.id);
}

fn confirm_removal(paper: &Paper) -> bool {
    print!("Delete \"{}\"? [y/N] ", paper.title);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn add(settings: &Settings, draft: PaperDraft) -> Result<()> {
    if !draft.is_submittable() {
        bail!(IntakeError::EmptyDraft);
    }

    let desk = IntakeDesk::new(settings.extractor()?);
    let mut library = settings.open_library();

    if desk.uses_ai() {
        println!("Analyzing with {:?} ({})...", settings.provider, settings.model());
    }

    match desk.submit(&draft, &mut library).await {
        Ok(paper) => {
            println!("Added to library ({} papers)\n", library.len());
            print_card(&paper);
            Ok(())
        }
        Err(e @ IntakeError::Extraction(_)) => {
            eprintln!("Paper analysis failed. Please try again.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn list(settings: &Settings, search: &str, category: &str) {
    let library = settings.open_library();
    let papers = query::filter_papers(library.iter(), search, category);

    if papers.is_empty() {
        if library.is_empty() {
            println!("Your library is empty. Add your first paper with `scholarflow add`.");
        } else {
            println!("No papers match.");
        }
        return;
    }

    println!("{} of {} papers\n", papers.len(), library.len());
    for paper in papers {
        print_card(paper);
    }
}

fn stats(settings: &Settings) {
    let library = settings.open_library();
    let stats = query::library_stats(library.iter());

    rule();
    println!("Library: {} papers", stats.total);
    rule();

    if stats.categories.is_empty() {
        println!("No data yet");
        return;
    }

    let widest = stats.categories.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
    let largest = stats.categories.iter().map(|c| c.count).max().unwrap_or(1);
    println!("\nCategory distribution:");
    for category in &stats.categories {
        let bar = "#".repeat((category.count * 40).div_ceil(largest));
        println!("  {:<widest$}  {} {}", category.name, bar, category.count);
    }

    println!("\nTop categories:");
    for (rank, category) in stats.top.iter().enumerate() {
        println!("  {}. {} ({} papers)", rank + 1, category.name, category.count);
    }
}

fn remove(settings: &Settings, id: Uuid, yes: bool) -> Result<()> {
    let mut library = settings.open_library();
    match library.remove(id, |paper| yes || confirm_removal(paper))? {
        Removal::Removed(paper) => println!("Deleted \"{}\"", paper.title),
        Removal::Declined => println!("Kept."),
        Removal::NotFound => bail!("no paper with id {}", id),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose, matches!(args.command, Command::Serve { .. }));
    let settings = args.settings();

    match args.command {
        Command::Add {
            title,
            authors,
            abstract_text,
            url,
            image,
        } => {
            let image = match image {
                Some(path) => Some(
                    ImageAttachment::from_path(&path)
                        .with_context(|| format!("could not read image {}", path.display()))?,
                ),
                None => None,
            };
            let draft = PaperDraft {
                title,
                authors,
                abstract_text,
                url,
                image,
            };
            add(&settings, draft).await
        }
        Command::List { search, category } => {
            list(&settings, &search, &category);
            Ok(())
        }
        Command::Show { id } => {
            let library = settings.open_library();
            let paper = library.get(id).ok_or_else(|| anyhow!("no paper with id {}", id))?;
            print_card(paper);
            if !paper.abstract_text.is_empty() {
                println!("Abstract:\n{}\n", paper.abstract_text);
            }
            Ok(())
        }
        Command::Categories => {
            let library = settings.open_library();
            for category in query::categories(library.iter()) {
                println!("{}", category);
            }
            Ok(())
        }
        Command::Stats => {
            stats(&settings);
            Ok(())
        }
        Command::Remove { id, yes } => remove(&settings, id, yes),
        Command::Serve { port } => {
            let desk = IntakeDesk::new(settings.extractor()?);
            let state = AppState::new(settings.open_library(), desk);
            web::start_web_server(state, port).await;
            Ok(())
        }
    }
}
