//! Callprep CLI - company research for sales call preparation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, rendering the briefing and handling top-level errors.

use std::io;
use std::path::PathBuf;

use callprep::report::{CompanyReport, ReportSection};
use callprep::scraper::{extract_excerpt, extract_title, HttpFetcher};
use callprep::{Config, PageFetcher, Researcher};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use scraper::Html;

#[derive(Parser)]
#[command(name = "callprep")]
#[command(author, version, about = "Company research briefings for sales call preparation", long_about = None)]
struct Cli {
    /// Path to a callprep.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a company and print its briefing
    Research {
        /// Company name
        company: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the excerpt extracted from a single page
    Excerpt {
        /// URL to fetch
        url: String,
        /// Company name used to locate the relevant passage
        #[arg(long, default_value = "")]
        company: String,
    },
    /// Print the JSON Schema of the report
    Schema,
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=callprep=debug for per-request detail
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Research { company, json } => {
            let config = load_config(cli.config.as_ref())?;
            let researcher = Researcher::from_config(config)?;

            if !json {
                eprintln!("Researching: {}", company);
            }
            let report = researcher.research(&company).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Excerpt { url, company } => {
            let config = load_config(cli.config.as_ref())?;
            let fetcher = HttpFetcher::new(&config.extract)?;

            println!("Fetching: {}", url);
            let html = fetcher.fetch(&url).await?;
            let document = Html::parse_document(&html);
            let title = extract_title(&document).unwrap_or_else(|| "No title".to_string());

            println!("\n=== {} ===\n", title);
            match extract_excerpt(&document, &company, config.extract.max_excerpt_chars) {
                Some(excerpt) => {
                    println!("{}", excerpt);
                    println!("\n--- Extracted {} characters ---", excerpt.chars().count());
                }
                None => println!("No readable text found."),
            }
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(CompanyReport);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "callprep", &mut io::stdout());
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn print_report(report: &CompanyReport) {
    println!(
        "\n{} {}",
        report.company_name.bold(),
        format!("({})", report.generated_at.format("%Y-%m-%d %H:%M UTC")).dimmed()
    );

    let signals = &report.signals;
    let mut figures = Vec::new();
    if let Some(count) = signals.employee_count {
        figures.push(format!("~{} employees", count));
    }
    if let Some(stage) = &signals.funding_stage {
        figures.push(stage.clone());
    }
    if let Some(amount) = &signals.funding_amount {
        figures.push(format!("raised {}", amount));
    }
    if let Some(cap) = &signals.market_cap {
        figures.push(format!("market cap {}", cap));
    }
    if !figures.is_empty() {
        println!("{}", figures.join(" · ").cyan());
    }

    for section in report.sections() {
        print_section(section);
    }

    println!("\n{}", "💡 Discovery Angles".bold());
    for (i, angle) in report.discovery_angles.iter().enumerate() {
        println!("  {}. {}", i + 1, angle.title.yellow());
        println!("     {}", angle.text);
        println!("     {}", angle.suggestion.dimmed());
    }
}

fn print_section(section: &ReportSection) {
    println!("\n{}", section.title.bold());
    if section.is_empty() {
        println!("  {}", "No data found.".dimmed());
        return;
    }
    for item in &section.items {
        println!("  • {}", item.text);
        println!("    {}", format!("{} <{}>", item.source_title, item.source_url).dimmed());
    }
}
