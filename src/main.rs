use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};

use guru_core::{GuruConfig, OutputFormat, PullRequestRecord};

#[derive(Parser)]
#[command(
    name = "guru",
    version,
    about = "Find domain experts from pull-request history",
    long_about = "Guru finds the people who actually know a codebase — by mining merged\n\
                   pull requests, embedding them into a vector space, and ranking\n\
                   contributors against your question by semantic match, recency, and\n\
                   contribution volume.\n\n\
                   Examples:\n  \
                     guru ingest -r facebook/react     Mine merged PRs from a repository\n  \
                     guru index                        Embed mined PRs into the search index\n  \
                     guru search 'GraphQL N+1 queries' Rank experts for a question\n  \
                     guru stats                        Show what the index holds\n  \
                     guru doctor                       Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .guru.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable report (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Mine merged pull requests from GitHub repositories
    #[command(
        long_about = "Mine merged pull requests from GitHub repositories.\n\n\
        Lists recently-updated closed PRs, keeps merged ones by human authors that\n\
        pass the size and age thresholds, and writes normalized records to a JSON\n\
        file. Scraped repos are cached on disk; use --refresh to bypass the cache.\n\n\
        Examples:\n  guru ingest -r facebook/react -r vercel/next.js\n  guru ingest --refresh -o data/prs.json"
    )]
    Ingest {
        /// Repositories to mine (owner/repo); defaults to target_repos in config
        #[arg(short, long)]
        repos: Vec<String>,

        /// Output JSON file (default: data/prs.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore cached data and re-scrape
        #[arg(long)]
        refresh: bool,
    },
    /// Embed mined PRs and load them into the search index
    #[command(
        long_about = "Embed mined PRs and load them into the search index.\n\n\
        Reads the JSON file written by 'guru ingest', embeds each PR's title,\n\
        description, and technology tags, and upserts the vectors into the SQLite\n\
        index. Re-running replaces records with the same PR id.\n\n\
        Examples:\n  guru index\n  guru index -i data/prs.json"
    )]
    Index {
        /// Input JSON file with mined PRs (default: data/prs.json)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Rank experts for a natural-language question
    #[command(
        long_about = "Rank experts for a natural-language question.\n\n\
        Embeds the question, retrieves the most similar PRs from the index, and\n\
        aggregates them per author into a weighted score blending semantic match,\n\
        recency, and contribution volume.\n\n\
        Examples:\n  guru search 'optimizing GraphQL N+1 queries'\n  guru search 'react server components' --repo facebook/react -n 5\n  guru search 'schema migrations' --tech sql --recency-weight 0.5"
    )]
    Search {
        /// The question to find experts for
        query: String,

        /// Number of experts to return (default from config: 10)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Restrict to one repository (owner/repo)
        #[arg(long)]
        repo: Option<String>,

        /// Restrict to PRs tagged with any of these technologies
        #[arg(long)]
        tech: Vec<String>,

        /// Recency weight in [0,1]; overrides config
        #[arg(long)]
        recency_weight: Option<f64>,

        /// Candidates fetched from the similarity search (default: 50)
        #[arg(long)]
        limit: Option<usize>,

        /// Embedding call timeout in seconds (default: 30)
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Show index statistics
    Stats,
    /// Create a default .guru.toml configuration file
    #[command(long_about = "Create a default .guru.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .guru.toml already exists.")]
    Init,
    /// Check your guru setup and environment
    #[command(long_about = "Check your guru setup and environment.\n\n\
        Runs diagnostics for the config file, GitHub token, embedding API key,\n\
        search index, and scrape cache. Use --format json for machine-readable\n\
        output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1m\x1b[33m⚡\x1b[0m \x1b[1mguru\x1b[0m v{version} — find the people who actually know the code\n");

        println!("Quick start:");
        println!("  \x1b[36mguru init\x1b[0m                         Create a .guru.toml config file");
        println!("  \x1b[36mguru ingest -r facebook/react\x1b[0m     Mine merged PRs from a repository");
        println!("  \x1b[36mguru index\x1b[0m                        Embed PRs into the search index");
        println!("  \x1b[36mguru search 'your question'\x1b[0m       Rank experts for a question\n");

        println!("All commands:");
        println!("  \x1b[32mingest\x1b[0m    Mine merged PRs from GitHub repositories");
        println!("  \x1b[32mindex\x1b[0m     Embed mined PRs into the search index");
        println!("  \x1b[32msearch\x1b[0m    Rank experts for a natural-language question");
        println!("  \x1b[32mstats\x1b[0m     Show what the index holds");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("guru v{version} — find the people who actually know the code\n");

        println!("Quick start:");
        println!("  guru init                         Create a .guru.toml config file");
        println!("  guru ingest -r facebook/react     Mine merged PRs from a repository");
        println!("  guru index                        Embed PRs into the search index");
        println!("  guru search 'your question'       Rank experts for a question\n");

        println!("All commands:");
        println!("  ingest    Mine merged PRs from GitHub repositories");
        println!("  index     Embed mined PRs into the search index");
        println!("  search    Rank experts for a natural-language question");
        println!("  stats     Show what the index holds");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'guru <command> --help' for details.");
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &GuruConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    let config_path = Path::new(".guru.toml");
    if config_path.exists() {
        let repo_count = config.github.target_repos.len();
        let detail = if repo_count > 0 {
            format!(".guru.toml found ({repo_count} target repos)")
        } else {
            ".guru.toml found".into()
        };
        checks.push(CheckResult::pass("config_file", detail));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".guru.toml not found",
            "run 'guru init' to create a default config",
        ));
    }

    // 2. GitHub token
    if config.github.token.is_some() || std::env::var("GITHUB_TOKEN").is_ok() {
        checks.push(CheckResult::pass(
            "github_token",
            "GITHUB_TOKEN set (5000 req/hr)",
        ));
    } else {
        checks.push(CheckResult::info(
            "github_token",
            "GITHUB_TOKEN not set — unauthenticated API allows only 60 req/hr",
        ));
    }

    // 3. Embedding provider + API key
    let emb_provider = &config.embedding.provider;
    let emb_model = &config.embedding.model;
    checks.push(CheckResult::pass(
        "embedding_provider",
        format!(
            "{emb_provider} (model: {emb_model}, {} dims)",
            config.embedding.dimensions
        ),
    ));
    if config.embedding.api_key.is_some() || std::env::var("OPENAI_API_KEY").is_ok() {
        checks.push(CheckResult::pass("embedding_api_key", "OPENAI_API_KEY set"));
    } else {
        checks.push(CheckResult::fail(
            "embedding_api_key",
            "OPENAI_API_KEY not set",
            "export OPENAI_API_KEY=... or set api_key in .guru.toml [embedding]",
        ));
    }

    // 4. Search index
    let index_path = Path::new(&config.index.path);
    if index_path.exists() {
        let detail = match rusqlite::Connection::open_with_flags(
            index_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        ) {
            Ok(conn) => {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM prs", [], |r| r.get(0))
                    .unwrap_or(0);
                format!("exists ({count} PRs)")
            }
            Err(_) => "exists".into(),
        };
        checks.push(CheckResult::pass("search_index", detail));
    } else {
        checks.push(CheckResult::info(
            "search_index",
            "not found (run 'guru ingest' then 'guru index' to create)",
        ));
    }

    // 5. Scrape cache
    let cache = guru_ingest::cache::PrCache::new(Path::new(&config.cache.dir));
    match cache.cached_repos() {
        Ok(repos) if !repos.is_empty() => {
            checks.push(CheckResult::info(
                "scrape_cache",
                format!("{} repos cached in {}", repos.len(), config.cache.dir),
            ));
        }
        _ => {
            checks.push(CheckResult::info("scrape_cache", "empty"));
        }
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("guru v{version} — Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                // Pad the name for alignment
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# guru configuration
# See: https://github.com/guru-dev/guru

[github]
# Personal access token; GITHUB_TOKEN env var also works.
# token = "ghp_..."
# target_repos = ["facebook/react", "vercel/next.js", "apollographql/apollo-server"]
# max_prs_per_repo = 100
# min_lines_changed = 50
# max_pr_age_days = 730

[cache]
# enabled = true
# dir = "data/cache"
# max_age_days = 7

[embedding]
# provider = "openai"
# model = "text-embedding-3-small"
# dimensions = 1536
# Point base_url at any OpenAI-compatible server for local embeddings:
# base_url = "http://localhost:8080/v1"

[index]
# path = ".guru/index.db"

[rank]
# retrieval_limit = 50
# top_n = 10
# recency_weight = 0.1
# volume_weight = 0.15
# recency_decay_per_day = 0.001
"#;

fn read_records(path: &Path) -> Result<Vec<PullRequestRecord>> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(format!("reading {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err(format!("parsing {}", path.display()))
}

fn write_records(path: &Path, records: &[PullRequestRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    let content = serde_json::to_string_pretty(records).into_diagnostic()?;
    std::fs::write(path, content)
        .into_diagnostic()
        .wrap_err(format!("writing {}", path.display()))
}

async fn run_ingest(
    config: &GuruConfig,
    repos: &[String],
    output: Option<&Path>,
    refresh: bool,
) -> Result<()> {
    let repos: Vec<String> = if repos.is_empty() {
        config.github.target_repos.clone()
    } else {
        repos.to_vec()
    };
    if repos.is_empty() {
        miette::bail!(miette::miette!(
            help = "Pass -r owner/repo, or set target_repos in .guru.toml [github]",
            "No repositories to ingest"
        ));
    }

    let client = guru_ingest::github::GitHubClient::new(&config.github)?;
    if !client.is_authenticated() {
        eprintln!("warning: GITHUB_TOKEN not set, API limited to 60 requests/hour");
    }
    let cache = guru_ingest::cache::PrCache::new(Path::new(&config.cache.dir));

    let bar = indicatif::ProgressBar::new(repos.len() as u64);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .into_diagnostic()?,
    );

    let mut all_records = Vec::new();
    for repo in &repos {
        bar.set_message(repo.clone());

        let cached = if config.cache.enabled && !refresh {
            cache.load(repo, config.cache.max_age_days)?
        } else {
            None
        };

        let records = match cached {
            Some(records) => {
                bar.println(format!("{repo}: {} PRs (cached)", records.len()));
                records
            }
            None => {
                let records = client.scrape_repo(repo, &config.github).await?;
                if config.cache.enabled {
                    cache.store(repo, &records)?;
                }
                bar.println(format!("{repo}: {} PRs (scraped)", records.len()));
                records
            }
        };

        all_records.extend(records);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let output = output.unwrap_or(Path::new("data/prs.json"));
    write_records(output, &all_records)?;
    println!(
        "Collected {} PRs from {} repos into {}",
        all_records.len(),
        repos.len(),
        output.display()
    );

    Ok(())
}

async fn run_index(config: &GuruConfig, input: Option<&Path>) -> Result<()> {
    let input = input.unwrap_or(Path::new("data/prs.json"));
    if !input.exists() {
        miette::bail!(miette::miette!(
            help = "Run 'guru ingest' first to mine PR data",
            "Input file not found: {}",
            input.display()
        ));
    }

    if config.embedding.api_key.is_none() && std::env::var("OPENAI_API_KEY").is_err() {
        miette::bail!(miette::miette!(
            help = "Set OPENAI_API_KEY or add api_key in your .guru.toml under [embedding]",
            "No API key configured for embedding provider '{}'",
            config.embedding.provider
        ));
    }

    let mut records = read_records(input)?;
    let embedder = guru_embed::EmbeddingClient::with_config(&config.embedding)?;

    // Only embed records with usable text.
    let mut texts = Vec::new();
    let mut indices = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let text = guru_embed::text::record_text(record);
        if !text.is_empty() {
            texts.push(text);
            indices.push(i);
        }
    }

    let bar = indicatif::ProgressBar::new_spinner();
    bar.set_message(format!("Embedding {} PRs...", texts.len()));
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    let embeddings = embedder.embed_batch(&texts).await?;
    bar.finish_and_clear();

    for (i, embedding) in indices.into_iter().zip(embeddings) {
        records[i].embedding = Some(embedding);
    }

    let index = guru_store::PrIndex::open(Path::new(&config.index.path))?;
    let written = index.upsert(&records)?;

    let stats = index.stats()?;
    println!(
        "Indexed {written} PRs ({} total, {} authors, {} repos)",
        stats.total_prs, stats.total_authors, stats.total_repos
    );

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    config: &GuruConfig,
    format: OutputFormat,
    query: &str,
    top_n: Option<usize>,
    repo: Option<String>,
    tech: Vec<String>,
    recency_weight: Option<f64>,
    limit: Option<usize>,
    timeout: u64,
) -> Result<()> {
    if config.embedding.api_key.is_none() && std::env::var("OPENAI_API_KEY").is_err() {
        miette::bail!(miette::miette!(
            help = "Set OPENAI_API_KEY or add api_key in your .guru.toml under [embedding]",
            "No API key configured for embedding provider '{}'",
            config.embedding.provider
        ));
    }

    let index_path = Path::new(&config.index.path);
    if !index_path.exists() {
        miette::bail!(miette::miette!(
            help = "Run 'guru ingest' and 'guru index' first to build the index",
            "Search index not found at {}",
            index_path.display()
        ));
    }

    let embedder = guru_embed::EmbeddingClient::with_config(&config.embedding)?;
    let index = guru_store::PrIndex::open(index_path)?;

    let mut rank_config = config.rank.clone();
    if let Some(limit) = limit {
        rank_config.retrieval_limit = limit;
    }
    let top_n = top_n.unwrap_or(rank_config.top_n);

    let finder = guru_rank::ExpertFinder::new(embedder, index, rank_config);
    let options = guru_rank::QueryOptions {
        top_n,
        repo_filter: repo,
        tech_filter: if tech.is_empty() { None } else { Some(tech) },
        recency_weight,
        timeout: Some(std::time::Duration::from_secs(timeout)),
    };

    let experts = finder.find_experts(query, &options).await?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&experts).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => {
            print!("{}", guru_rank::report::format_markdown(&experts, top_n));
        }
        OutputFormat::Text => {
            println!("{}", guru_rank::report::format(&experts, top_n));
        }
    }

    Ok(())
}

fn run_stats(config: &GuruConfig, format: OutputFormat) -> Result<()> {
    let index_path = Path::new(&config.index.path);
    if !index_path.exists() {
        miette::bail!(miette::miette!(
            help = "Run 'guru ingest' and 'guru index' first to build the index",
            "Search index not found at {}",
            index_path.display()
        ));
    }

    let index = guru_store::PrIndex::open(index_path)?;
    let stats = index.stats()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
        }
        _ => {
            println!("Index: {}", index_path.display());
            println!("  PRs:     {}", stats.total_prs);
            println!("  Authors: {}", stats.total_authors);
            println!("  Repos:   {}", stats.total_repos);
            println!("  Size:    {} bytes", stats.index_size_bytes);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GuruConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".guru.toml");
            if default_path.exists() {
                GuruConfig::from_file(default_path)?
            } else {
                GuruConfig::default()
            }
        }
    };

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "embedding: {} ({} dims), index: {}",
            config.embedding.model, config.embedding.dimensions, config.index.path
        );
    }

    match cli.command {
        None => {
            print_welcome(use_color);
            Ok(())
        }
        Some(Command::Ingest {
            ref repos,
            ref output,
            refresh,
        }) => run_ingest(&config, repos, output.as_deref(), refresh).await,
        Some(Command::Index { ref input }) => run_index(&config, input.as_deref()).await,
        Some(Command::Search {
            ref query,
            top_n,
            ref repo,
            ref tech,
            recency_weight,
            limit,
            timeout,
        }) => {
            run_search(
                &config,
                cli.format,
                query,
                top_n,
                repo.clone(),
                tech.clone(),
                recency_weight,
                limit,
                timeout,
            )
            .await
        }
        Some(Command::Stats) => run_stats(&config, cli.format),
        Some(Command::Init) => {
            let path = Path::new(".guru.toml");
            if path.exists() {
                miette::bail!(".guru.toml already exists, refusing to overwrite");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .guru.toml — edit it, then run 'guru ingest'.");
            Ok(())
        }
        Some(Command::Doctor) => run_doctor(&config, cli.format, use_color),
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "guru", &mut std::io::stdout());
            Ok(())
        }
    }
}
