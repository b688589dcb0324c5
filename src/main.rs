//! reqflow - turn specification documents into requirements artifacts and
//! tracker work items.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reqflow::core::{Config, SessionStore};
use reqflow::workflow::{
    ArtifactSelection, ArtifactType, Assistant, DocumentCandidate, EntryStatus,
    GenerationResult, OutputFormat, PushOptions, PushResult, Role, SendOutcome, ValidationError,
    Workflow, WorkflowState,
};
use reqflow::HttpBackend;

/// Turn specification documents into requirements artifacts and work items
#[derive(Parser)]
#[command(name = "reqflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend API base URL (overrides config and REQFLOW_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file to use instead of the default
    #[arg(long, global = true)]
    session: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF or DOCX specification
    Upload {
        /// Document to upload
        file: PathBuf,

        /// MIME type, if it cannot be inferred from the extension
        #[arg(long)]
        mime: Option<String>,
    },

    /// Generate artifacts from the uploaded specification
    Generate {
        /// Output format (docx, pdf)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Generate only these artifact types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<ArtifactType>,

        /// Leave out these artifact types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ArtifactType>,

        /// Generate from a plain-text specification instead of the upload
        #[arg(long)]
        text_file: Option<PathBuf>,
    },

    /// Download a generated artifact
    Download {
        /// Artifact type (epic, stories, use_cases, tdd, data_model)
        artifact: Option<ArtifactType>,

        /// Download every artifact of the last generation
        #[arg(long, conflicts_with_all = ["artifact", "latest"])]
        all: bool,

        /// Download the service's most recent document
        #[arg(long, conflicts_with = "artifact")]
        latest: bool,

        /// Output format (defaults to the session's format)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Directory to save into
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Push generated artifacts to the issue tracker
    Push {
        /// Work item type to create
        #[arg(short = 't', long)]
        work_item_type: Option<String>,

        /// Tracker project
        #[arg(long)]
        project: Option<String>,

        /// Area path for created items
        #[arg(long)]
        area_path: Option<String>,

        /// Iteration path for created items
        #[arg(long)]
        iteration_path: Option<String>,
    },

    /// Chat with the assistant (interactive without a message)
    Chat {
        /// Message to send
        message: Option<String>,

        /// Answer without consulting uploaded documents
        #[arg(long)]
        no_rag: bool,
    },

    /// Upload, generate, and optionally download and push in one go
    Run {
        /// Document to upload
        file: PathBuf,

        /// Output format (docx, pdf)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Generate only these artifact types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<ArtifactType>,

        /// Leave out these artifact types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ArtifactType>,

        /// Download every generated artifact
        #[arg(long)]
        download: bool,

        /// Directory to save downloads into
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Push generated artifacts to the tracker
        #[arg(long)]
        push: bool,
    },

    /// Show the current session
    Status {
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the backend service is reachable
    Health,

    /// Forget the saved session
    Reset,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let _ = dotenvy::dotenv();

    match cli.command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return Ok(());
        }
        Commands::Config { path } => return cmd_config(path),
        _ => {}
    }

    let mut config = Config::load()?;
    if let Some(url) = cli.base_url {
        config.backend.base_url = url;
    }
    let store = match cli.session {
        Some(path) => SessionStore::with_path(path),
        None => SessionStore::new()?,
    };
    let ctx = Context { config, store };

    match cli.command {
        Commands::Upload { file, mime } => cmd_upload(&ctx, file, mime),
        Commands::Generate { format, only, exclude, text_file } => {
            cmd_generate(&ctx, format, &only, &exclude, text_file)
        }
        Commands::Download { artifact, all, latest, format, out } => {
            cmd_download(&ctx, artifact, all, latest, format, out)
        }
        Commands::Push { work_item_type, project, area_path, iteration_path } => {
            let mut options = ctx.config.push_options();
            if let Some(t) = work_item_type {
                options.work_item_type = t;
            }
            options.project_name = project.or(options.project_name);
            options.area_path = area_path.or(options.area_path);
            options.iteration_path = iteration_path.or(options.iteration_path);
            cmd_push(&ctx, &options)
        }
        Commands::Chat { message, no_rag } => cmd_chat(&ctx, message, no_rag),
        Commands::Run { file, format, only, exclude, download, out, push } => {
            cmd_run(&ctx, file, format, &only, &exclude, download, out, push)
        }
        Commands::Status { json } => cmd_status(&ctx, json),
        Commands::Health => cmd_health(&ctx),
        Commands::Reset => cmd_reset(&ctx),
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

/// Loaded configuration and session location.
struct Context {
    config: Config,
    store: SessionStore,
}

impl Context {
    /// Open a workflow over the saved session.
    fn workflow(&self) -> Result<Workflow<HttpBackend>> {
        let backend =
            HttpBackend::new(&self.config.backend.base_url, self.config.timeouts.policy())?;
        let state = self.store.load_state()?;
        let fresh = state == WorkflowState::default();
        let assistant = Assistant::new()
            .with_rag_mode(self.config.chat.use_rag)
            .with_history(self.config.chat.include_history);

        let mut workflow = Workflow::new(backend)
            .with_state(state)
            .with_download_dir(self.config.download_dir())
            .with_assistant(assistant);

        // The configured format only seeds a new session
        if fresh {
            workflow.set_output_format(self.config.output.format);
        }
        Ok(workflow)
    }

    fn save(&self, state: &WorkflowState) -> Result<()> {
        self.store.save(state).context("Failed to save session")
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

/// Apply `--only`/`--exclude` to the session selection.
fn apply_selection(
    workflow: &mut Workflow<HttpBackend>,
    only: &[ArtifactType],
    exclude: &[ArtifactType],
) {
    if !only.is_empty() {
        let selection = ArtifactSelection::only(only);
        for t in ArtifactType::ALL {
            workflow.toggle_artifact_type(t, selection.is_selected(t));
        }
    }
    for t in exclude {
        workflow.toggle_artifact_type(*t, false);
    }
}

/// Upload a document.
fn cmd_upload(ctx: &Context, file: PathBuf, mime: Option<String>) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;

    let candidate = match mime {
        Some(mime) => DocumentCandidate::new(file, mime),
        None => DocumentCandidate::from_path(file),
    };
    workflow.select_file(candidate)?;

    let name = workflow.state().selected_file().map_or("", |f| f.file_name.as_str());
    println!("Uploading {}...", name);
    let result = rt.block_on(workflow.upload());
    ctx.save(workflow.state())?;
    let reference = result?;

    println!("✓ Upload successful!");
    println!("  File: {}", reference.file_name);
    println!("  File path: {}", reference.file_path);
    if reference.indexed == Some(false) {
        println!("  (not indexed for chat; answers will not use this document)");
    }
    Ok(())
}

/// Generate artifacts.
fn cmd_generate(
    ctx: &Context,
    format: Option<OutputFormat>,
    only: &[ArtifactType],
    exclude: &[ArtifactType],
    text_file: Option<PathBuf>,
) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;

    apply_selection(&mut workflow, only, exclude);
    if let Some(format) = format {
        workflow.set_output_format(format);
    }

    let text = text_file
        .map(|path| {
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let selected: Vec<String> =
        workflow.state().selection().selected().iter().map(ToString::to_string).collect();
    println!(
        "Generating {} as {}... (this may take several minutes)",
        selected.join(", "),
        workflow.state().format()
    );

    let result = rt.block_on(async {
        match text {
            Some(text) => workflow.generate_from_text(&text).await,
            None => workflow.generate().await,
        }
    });
    ctx.save(workflow.state())?;
    print_generation(&result?);
    Ok(())
}

fn print_generation(result: &GenerationResult) {
    println!("✓ Generation complete!");
    println!("  {}", result.message);
    for (artifact, path) in &result.file_paths {
        println!("  {:<12} {}", artifact.as_str(), path);
    }
}

/// Download generated artifacts.
fn cmd_download(
    ctx: &Context,
    artifact: Option<ArtifactType>,
    all: bool,
    latest: bool,
    format: Option<OutputFormat>,
    out: Option<PathBuf>,
) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;
    if let Some(dir) = out {
        workflow = workflow.with_download_dir(dir);
    }
    if let Some(format) = format {
        workflow.set_output_format(format);
    }

    if latest {
        let saved = rt.block_on(workflow.download_latest())?;
        println!("✓ Saved {} ({} bytes)", saved.path.display(), saved.size);
        return Ok(());
    }

    let targets = if all {
        let types = workflow
            .state()
            .generation()
            .map(GenerationResult::artifact_types)
            .unwrap_or_default();
        if types.is_empty() {
            return Err(ValidationError::NothingGenerated.into());
        }
        types
    } else {
        let artifact = artifact
            .ok_or_else(|| anyhow::anyhow!("Specify an artifact type, --all, or --latest"))?;
        vec![artifact]
    };

    for artifact in targets {
        let saved = rt.block_on(workflow.download(artifact))?;
        println!("✓ Saved {} ({} bytes)", saved.path.display(), saved.size);
    }
    Ok(())
}

/// Push generated artifacts to the tracker.
fn cmd_push(ctx: &Context, options: &PushOptions) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;

    println!("Pushing to tracker as {}...", options.work_item_type);
    let result = rt.block_on(workflow.push(options));
    ctx.save(workflow.state())?;
    print_push(&result?);
    Ok(())
}

fn print_push(result: &PushResult) {
    println!("✓ {}", result.message);
    if !result.work_items_created.is_empty() {
        println!("\nCreated Work Items:");
        for item in &result.work_items_created {
            println!("  {} (ID: {})  {}", item.title, item.id, item.url);
        }
    }
    if !result.errors.is_empty() {
        println!("\nNot pushed:");
        for error in &result.errors {
            println!("  {}", error);
        }
    }
}

/// Chat with the assistant.
fn cmd_chat(ctx: &Context, message: Option<String>, no_rag: bool) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;
    if no_rag {
        workflow.assistant_mut().set_rag_mode(false);
    }

    if let Some(message) = message {
        rt.block_on(workflow.chat(&message));
        print_last_reply(&workflow);
        return Ok(());
    }

    println!("Ask me questions about your requirements or the system!");
    println!("Commands: /rag on|off, /clear, /quit\n");

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                workflow.assistant_mut().clear();
                println!("(conversation cleared)");
                continue;
            }
            "/rag on" => {
                workflow.assistant_mut().set_rag_mode(true);
                println!("(RAG enabled)");
                continue;
            }
            "/rag off" => {
                workflow.assistant_mut().set_rag_mode(false);
                println!("(RAG disabled)");
                continue;
            }
            _ => {}
        }

        if rt.block_on(workflow.chat(line)) != SendOutcome::Ignored {
            print_last_reply(&workflow);
        }
    }
    Ok(())
}

fn print_last_reply(workflow: &Workflow<HttpBackend>) {
    if let Some(entry) = workflow.assistant().transcript().last() {
        if entry.role == Role::Assistant {
            let label = if entry.status == EntryStatus::Failed { "AI (failed)" } else { "AI" };
            println!("{}: {}\n", label, entry.content);
        }
    }
}

/// Run the whole pipeline.
fn cmd_run(
    ctx: &Context,
    file: PathBuf,
    format: Option<OutputFormat>,
    only: &[ArtifactType],
    exclude: &[ArtifactType],
    download: bool,
    out: Option<PathBuf>,
    push: bool,
) -> Result<()> {
    let rt = runtime()?;
    let mut workflow = ctx.workflow()?;
    if let Some(dir) = out {
        workflow = workflow.with_download_dir(dir);
    }

    workflow.select_file(DocumentCandidate::from_path(file))?;
    apply_selection(&mut workflow, only, exclude);
    if let Some(format) = format {
        workflow.set_output_format(format);
    }

    let outcome = rt.block_on(async {
        let reference = workflow.upload().await?;
        println!("✓ Uploaded {} → {}", reference.file_name, reference.file_path);

        println!("Generating... (this may take several minutes)");
        let generation = workflow.generate().await?;
        print_generation(&generation);

        if download {
            for artifact in generation.artifact_types() {
                let saved = workflow.download(artifact).await?;
                println!("✓ Saved {}", saved.path.display());
            }
        }

        if push {
            let result = workflow.push(&ctx.config.push_options()).await?;
            print_push(&result);
        }
        Ok::<(), anyhow::Error>(())
    });

    ctx.save(workflow.state())?;
    outcome
}

/// Show the saved session.
fn cmd_status(ctx: &Context, json: bool) -> Result<()> {
    let state = ctx.store.load_state()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Stage: {}", state.stage());
    match state.upload() {
        Some(upload) => println!("Document: {} ({})", upload.file_name, upload.file_path),
        None => println!("Document: none"),
    }

    let selected: Vec<&str> = state.selection().selected().iter().map(|t| t.as_str()).collect();
    let selected = if selected.is_empty() { "none".to_string() } else { selected.join(", ") };
    println!("Selected: {}", selected);
    println!("Format: {}", state.format());

    if let Some(generation) = state.generation() {
        let generated: Vec<&str> = generation.file_paths.keys().map(|t| t.as_str()).collect();
        println!("Generated ({}): {}", generation.format, generated.join(", "));
    }
    if let Some(push) = state.last_push() {
        println!("Last push: {} work item(s)", push.work_items_created.len());
    }
    Ok(())
}

/// Check service health.
fn cmd_health(ctx: &Context) -> Result<()> {
    let rt = runtime()?;
    let workflow = ctx.workflow()?;

    match rt.block_on(workflow.health()) {
        Ok(health) if health.is_healthy() => {
            println!("✓ Service is healthy ({})", ctx.config.backend.base_url);
            Ok(())
        }
        Ok(health) => anyhow::bail!("Service reported status: {}", health.status),
        Err(e) => anyhow::bail!("Service unreachable at {}: {}", ctx.config.backend.base_url, e),
    }
}

/// Forget the saved session.
fn cmd_reset(ctx: &Context) -> Result<()> {
    if ctx.store.reset()? {
        println!("Session cleared.");
    } else {
        println!("No saved session.");
    }
    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("Could not determine config directory"),
        }
        return Ok(());
    }

    let config = Config::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "reqflow", &mut io::stdout());
}
