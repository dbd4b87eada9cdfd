//! redline — LLM-assisted file review and rewrite CLI.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use std::io::Write as _;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::args::{Cli, Command, OutputFormat};
use redline::backend::credentials::{self, CredentialEvent, CredentialState};
use redline::backend::{validate_credential, Backend, HttpBackend};
use redline::chat;
use redline::config::Config;
use redline::constants;
use redline::env::Env;
use redline::gitdiff;
use redline::models::{BackendKind, FileReview, Summary};
use redline::progress::ProgressTracker;
use redline::review;
use redline::scheduler;
use redline::session::Session;
use redline::watch;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(constants::ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let root = std::fs::canonicalize(&cli.path)
        .with_context(|| format!("--path directory not found: {}", cli.path.display()))?;
    let env = Env::real();
    let config = Config::load(Some(&root), &env).context("failed to load configuration")?;

    match cli.command {
        Command::Chat => {
            let session = Arc::new(build_session(&root, config, &env)?);
            chat::run_chat(session).await.context("chat session failed")
        }
        Command::Review(args) => run_review(&root, config, &env, args).await,
        Command::Project(args) => run_project(&root, config, &env, args.no_progress).await,
        Command::Selection(args) => {
            let session = build_session(&root, config, &env)?;
            let result = review::review_selection(&session, &args.file, args.start, args.end)
                .await
                .context("selection review failed")?;
            print!("{}", cli::render(OutputFormat::Terminal, &[result]));
            Ok(())
        }
        Command::Diff(args) => run_diff(&root, config, &env, args.format).await,
        Command::Explain(args) => {
            let session = build_session(&root, config, &env)?;
            let explanation = review::explain_file(&session, &args.file)
                .await
                .context("explain failed")?;
            println!("{explanation}");
            Ok(())
        }
        Command::Generate(args) => {
            let session = build_session(&root, config, &env)?;
            let (reply, code) = review::generate_code(&session, &args.description)
                .await
                .context("generation failed")?;
            match (args.out, code) {
                (Some(out), Some(code)) => write_generated(&session, &out, &code)?,
                (Some(_), None) => {
                    bail!("the backend reply contained no code block:\n{reply}");
                }
                (None, _) => println!("{reply}"),
            }
            Ok(())
        }
        Command::Watch => run_watch(&root, config, &env).await,
        Command::Configure => run_configure(&root, config).await,
    }
}

/// Place generated code. An existing file goes through the mutation
/// gate (diff, confirm, backup); a new file is written directly.
fn write_generated(session: &Session, out: &Path, code: &str) -> Result<()> {
    if out.exists() {
        let original = std::fs::read_to_string(out)
            .with_context(|| format!("failed to read {}", out.display()))?;
        let review = FileReview {
            path: out.display().to_string(),
            original,
            review: String::new(),
            suggested: Some(code.to_string()),
            issues: Vec::new(),
            related: Vec::new(),
        };
        chat::offer_apply(session, &review);
    } else {
        std::fs::write(out, code).with_context(|| format!("failed to write {}", out.display()))?;
        println!("wrote {}", out.display());
    }
    Ok(())
}

fn build_session(root: &Path, config: Config, env: &Env) -> Result<Session> {
    Session::new(root, config, env).context(
        "failed to set up the backend (run `redline configure` to set a credential)",
    )
}

async fn run_review(
    root: &Path,
    mut config: Config,
    env: &Env,
    args: cli::args::ReviewArgs,
) -> Result<()> {
    if args.apply {
        config.review.auto_apply = true;
    }

    let session = Arc::new(build_session(root, config, env)?);

    if let Some(file) = args.file {
        let result = if args.refactor {
            review::refactor_file(&session, &file).await
        } else {
            review::review_file(&session, &file).await
        }
        .context("review failed")?;

        print!("{}", cli::render(args.format, std::slice::from_ref(&result)));
        if args.format == OutputFormat::Terminal {
            chat::offer_apply(&session, &result);
        }
        return Ok(());
    }

    if args.refactor {
        bail!("--refactor needs a file argument");
    }

    let report = run_batch_with_progress(
        &session,
        args.no_progress || args.format != OutputFormat::Terminal,
    )
    .await?;

    print!("{}", cli::render(args.format, &report.reviews));
    for (path, message) in &report.errors {
        eprintln!("{}", format!("{path}: {message}").red());
    }
    if args.format == OutputFormat::Terminal {
        for result in &report.reviews {
            chat::offer_apply(&session, result);
        }
    }
    if !report.errors.is_empty() {
        bail!(
            "{} file(s) failed after retries — results are incomplete",
            report.errors.len()
        );
    }
    Ok(())
}

async fn run_project(root: &Path, config: Config, env: &Env, no_progress: bool) -> Result<()> {
    let session = Arc::new(build_session(root, config, env)?);
    let report = run_batch_with_progress(&session, no_progress).await?;

    print!("{}", cli::render(OutputFormat::Terminal, &report.reviews));

    let context = session.project_context();
    if !context.is_empty() {
        println!("{}", "Project notes".bold().underline());
        for (path, summary) in &context {
            println!("  {}: {summary}", path.bold());
        }
    }
    for (path, message) in &report.errors {
        eprintln!("{}", format!("{path}: {message}").red());
    }
    println!("{}", report.summary_line().bold());
    Ok(())
}

async fn run_batch_with_progress(
    session: &Arc<Session>,
    no_progress: bool,
) -> Result<scheduler::BatchReport> {
    let files = scheduler::enumerate_files(
        session.root(),
        session.filter(),
        session.config().review.max_files,
    );
    let progress = Arc::new(ProgressTracker::new(&files, !no_progress));
    progress.start();

    // Ctrl-C stops scheduling; in-flight reviews finish first.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let report = scheduler::run_batch(Arc::clone(session), Arc::clone(&progress), cancel)
        .await
        .context("nothing to review")?;

    let summary = Summary::from_reviews(&report.reviews);
    progress.finish(summary.issues);
    if report.cancelled > 0 {
        eprintln!("cancelled before reviewing {} file(s)", report.cancelled);
    }
    Ok(report)
}

async fn run_diff(root: &Path, config: Config, env: &Env, format: OutputFormat) -> Result<()> {
    let session = build_session(root, config, env)?;
    let repo_root = gitdiff::find_repo_root(root)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let repo_root = Path::new(&repo_root);

    let changed = gitdiff::changed_files(repo_root)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if changed.is_empty() {
        println!("no uncommitted changes");
        return Ok(());
    }

    let mut reviews: Vec<FileReview> = Vec::new();
    for path in changed {
        if !session.filter().includes(Path::new(&path)) {
            continue;
        }
        let diff = gitdiff::file_diff(repo_root, &path)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        if diff.is_empty() {
            continue;
        }
        let result = review::review_diff(&session, &path, &diff)
            .await
            .with_context(|| format!("diff review failed for {path}"))?;
        reviews.push(result);
    }

    print!("{}", cli::render(format, &reviews));
    Ok(())
}

async fn run_watch(root: &Path, config: Config, env: &Env) -> Result<()> {
    let session = Arc::new(build_session(root, config, env)?);
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    println!(
        "watching {} (debounce {}ms) — press Ctrl-C to stop",
        root.display(),
        session.config().review.debounce_ms
    );

    let callback_session = Arc::clone(&session);
    watch::run_watch(Arc::clone(&session), cancel, move |path| {
        let session = Arc::clone(&callback_session);
        async move {
            println!("{}", format!("re-reviewing {path}").cyan());
            match review::review_file(&session, &path).await {
                Ok(result) => {
                    print!("{}", cli::render(OutputFormat::Terminal, &[result]));
                }
                Err(e) => eprintln!("{}", format!("{path}: {e}").red()),
            }
        }
    })
    .await
    .context("watch failed")
}

async fn run_configure(root: &Path, config: Config) -> Result<()> {
    println!("{}", "redline configuration".bold());
    println!("Available backends:");
    for (i, kind) in BackendKind::all().iter().enumerate() {
        println!("  {}. {kind}", i + 1);
    }

    let kind = loop {
        let answer = prompt_line(&format!("Backend [{}]: ", config.backend.kind))?;
        if answer.is_empty() {
            break config.backend.kind;
        }
        match answer.parse::<BackendKind>() {
            Ok(kind) => break kind,
            Err(e) => eprintln!("{}", e.yellow()),
        }
    };

    let model = {
        let answer = prompt_line(&format!("Model [{}]: ", config.backend.model))?;
        if answer.is_empty() {
            config.backend.model.clone()
        } else {
            answer
        }
    };

    let base_url = {
        let default = config
            .backend
            .base_url
            .clone()
            .unwrap_or_else(|| redline::backend::default_base_url(kind).to_string());
        let answer = prompt_line(&format!("Base URL [{default}]: "))?;
        if answer.is_empty() {
            config.backend.base_url.clone()
        } else {
            Some(answer)
        }
    };

    // Bounded prompt/validate loop.
    let mut state = credentials::step(CredentialState::Idle, CredentialEvent::Begin);
    let mut candidate: Option<String> = None;
    let mut accepted: Option<String> = None;

    while !matches!(state, CredentialState::Ready | CredentialState::Aborted) {
        match state {
            CredentialState::Prompting | CredentialState::Retrying { .. } => {
                let label = match kind {
                    BackendKind::Ollama => "Credential (none needed, press Enter): ",
                    _ => "Credential: ",
                };
                let answer = prompt_line(label)?;
                candidate = (!answer.is_empty()).then_some(answer);
                if candidate.is_none() && kind != BackendKind::Ollama {
                    state = credentials::step(state, CredentialEvent::UserCancelled);
                } else {
                    state = credentials::step(state, CredentialEvent::Entered);
                }
            }
            CredentialState::Validating { .. } => {
                let event = match validate_and_probe(
                    kind,
                    &model,
                    base_url.clone(),
                    candidate.clone(),
                    config.backend.timeout_secs,
                )
                .await
                {
                    Ok(()) => {
                        accepted = candidate.clone();
                        CredentialEvent::ValidationPassed
                    }
                    Err(message) => {
                        eprintln!("{}", message.yellow());
                        CredentialEvent::ValidationFailed
                    }
                };
                state = credentials::step(state, event);
            }
            _ => break,
        }
    }

    if state == CredentialState::Aborted {
        bail!("configuration aborted — credential was not accepted");
    }

    if let Some(secret) = &accepted {
        credentials::store(kind, secret).map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("credential stored for {kind}");
    }

    let mut updated = config;
    updated.backend.kind = kind;
    updated.backend.model = model;
    updated.backend.base_url = base_url;
    let rendered = toml::to_string_pretty(&updated).context("failed to serialize config")?;
    let config_path = root.join(constants::CONFIG_FILENAME);
    std::fs::write(&config_path, rendered)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}

/// Validate the credential shape, then probe the service.
async fn validate_and_probe(
    kind: BackendKind,
    model: &str,
    base_url: Option<String>,
    credential: Option<String>,
    timeout_secs: u64,
) -> std::result::Result<(), String> {
    validate_credential(kind, credential.as_deref())?;
    let backend = HttpBackend::new(
        kind,
        model,
        base_url,
        credential,
        Duration::from_secs(timeout_secs),
    )
    .map_err(|e| e.to_string())?;
    if backend.test_connection().await {
        Ok(())
    } else {
        Err(format!("could not reach the {kind} service with that credential"))
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}
