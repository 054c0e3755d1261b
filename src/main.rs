use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use research_crew::config::{find_config_file, get_config, load_config, Config};
use research_crew::crew::{research_crew, AgentExecutor};
use research_crew::llm::{LanguageModel, OpenAIChat};
use research_crew::mcp::{McpServer, ToolRegistry};
use research_crew::research::{read_papers, search_and_save, PaperPipeline, ResearchContext};
use research_crew::sources::{GoogleScholarSource, WikipediaSource};
use research_crew::ui::{self, Spinner, Status};
use research_crew::utils::{extract_text, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Crew - agents that search Google Scholar, read papers and write up the answer
#[derive(Parser, Debug)]
#[command(name = "research-crew")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-agent research assistant over Google Scholar papers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for search results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the research crew (default)
    Run {
        /// Print every task's output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search Google Scholar
    #[command(alias = "s")]
    Search {
        /// Search query, preferably in English
        query: String,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
        output: OutputFormat,
    },

    /// Search Google Scholar, then answer a question from the papers found
    Ask {
        /// Search query, preferably in English
        query: String,

        /// Question to answer over the found papers
        #[arg(long)]
        question: String,
    },

    /// Print the text extracted from a PDF file
    Extract {
        /// Path to the PDF file
        path: PathBuf,
    },

    /// Serve the research tools over MCP (stdio)
    Serve,

    /// Write a default configuration file
    InitConfig {
        /// Where to write it (default: ./research-crew.toml)
        path: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Shared components built from the configuration
struct App {
    config: Config,
    scholar: Arc<GoogleScholarSource>,
    wikipedia: Arc<WikipediaSource>,
    pipeline: Arc<PaperPipeline>,
    model: Arc<dyn LanguageModel>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let client =
            HttpClient::with_config(&config.http).context("Failed to create HTTP client")?;

        let model: Arc<dyn LanguageModel> = Arc::new(OpenAIChat::new(
            client.clone(),
            &config.endpoints.openai_base,
            &config.models.chat_model,
            config.models.temperature,
            config.api_keys.openai.clone(),
        ));

        let pipeline = PaperPipeline::from_config(&config, client.clone(), model.clone())
            .context("Failed to set up the paper pipeline")?;

        Ok(Self {
            scholar: Arc::new(GoogleScholarSource::from_config(&config, client.clone())),
            wikipedia: Arc::new(WikipediaSource::from_config(&config, client)),
            pipeline: Arc::new(pipeline),
            model,
            config,
        })
    }

    fn tools(&self) -> ToolRegistry {
        ToolRegistry::research_tools(
            self.scholar.clone(),
            self.wikipedia.clone(),
            self.pipeline.clone(),
        )
    }
}

fn init_tracing(cli: &Cli) {
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let level = if cli.quiet { "error" } else { level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_crew={}", level)),
    );

    // stdout belongs to MCP in `serve` mode, so logs always go to stderr
    let json_layer = cli.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!cli.json_logs).then(|| {
        tracing_subscriber::fmt::layer().with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn load_configuration(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    get_config().context("Failed to read configuration from the environment")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "research-crew",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        Some(Commands::InitConfig { ref path }) => {
            let path = path
                .clone()
                .unwrap_or_else(|| PathBuf::from("research-crew.toml"));
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            Config::default().save(&path)?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
            return Ok(());
        }
        Some(Commands::Extract { ref path }) => {
            let config = load_configuration(&cli)?;
            let path = path.clone();
            let max_page_chars = config.pdf.max_page_chars;
            let text = tokio::task::spawn_blocking(move || extract_text(&path, max_page_chars))
                .await
                .context("PDF extraction task failed")?;
            match text {
                Some(text) => println!("{}", text),
                None => bail!("Could not extract text from the file"),
            }
            return Ok(());
        }
        _ => {}
    }

    let app = App::new(load_configuration(&cli)?)?;

    match cli.command {
        None => run_crew(&app, false, cli.quiet).await,
        Some(Commands::Run { json }) => run_crew(&app, json, cli.quiet).await,
        Some(Commands::Search { ref query, output }) => search(&app, query, output, cli.quiet).await,
        Some(Commands::Ask {
            ref query,
            ref question,
        }) => ask(&app, query, question, cli.quiet).await,
        Some(Commands::Serve) => serve(&app).await,
        Some(Commands::Extract { .. })
        | Some(Commands::InitConfig { .. })
        | Some(Commands::Completions { .. }) => Ok(()),
    }
}

async fn run_crew(app: &App, json: bool, quiet: bool) -> Result<()> {
    let crew = research_crew();
    let executor = AgentExecutor::new(
        app.model.clone(),
        Arc::new(app.tools()),
        app.config.agents.max_iterations,
    );
    let mut context = ResearchContext::new();

    tracing::info!(
        "Starting crew: {} agents, {} tasks",
        crew.agents().len(),
        crew.tasks().len()
    );
    let output = crew.kickoff(&executor, &mut context).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if quiet {
        println!("{}", output.final_output());
    } else {
        ui::print_crew_output(&output);
        ui::print_status(
            Status::Info,
            &format!("{} papers were collected during the run", context.len()),
        );
    }
    Ok(())
}

async fn search(app: &App, query: &str, output: OutputFormat, quiet: bool) -> Result<()> {
    let format = match output {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    };

    let spinner = if quiet || format == OutputFormat::Json {
        Spinner::hidden()
    } else {
        Spinner::new(&format!("Searching Google Scholar for \"{}\"", query))
    };

    let records = match app.scholar.search(query).await {
        Ok(records) => {
            spinner.finish_with_success(&format!("Found {} papers", records.len()));
            records
        }
        Err(e) => {
            spinner.finish_with_error("Search failed");
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => ui::print_papers_table(&records),
    }
    Ok(())
}

async fn ask(app: &App, query: &str, question: &str, quiet: bool) -> Result<()> {
    let mut context = ResearchContext::new();

    let spinner = if quiet {
        Spinner::hidden()
    } else {
        Spinner::new(&format!("Searching Google Scholar for \"{}\"", query))
    };
    let found = search_and_save(&mut context, &app.scholar, query).await?;
    spinner.set_message(&format!("Reading {} papers", found));

    let answer = read_papers(&context, &app.pipeline, question).await;
    spinner.finish_and_clear();

    let answer = answer?;
    if !quiet {
        ui::print_section(question);
    }
    println!("{}", answer);
    Ok(())
}

async fn serve(app: &App) -> Result<()> {
    let context = Arc::new(Mutex::new(ResearchContext::new()));
    let server = McpServer::new(&app.tools(), context).context("Failed to build MCP server")?;
    server.run().await.context("MCP server failed")?;
    Ok(())
}
