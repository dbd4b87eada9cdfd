//! Interactive chat loop with slash commands.
//!
//! Free text goes to the backend as conversation; slash commands drive
//! the review pipeline. Command parsing is pure so it can be tested
//! without a terminal.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::apply::{self, AutoConfirm, Confirm, GateOutcome, TerminalConfirm};
use crate::backend::retry;
use crate::gitdiff;
use crate::models::FileReview;
use crate::output::{OutputRenderer, TerminalRenderer};
use crate::progress::ProgressTracker;
use crate::review;
use crate::scheduler;
use crate::session::Session;

/// A parsed line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Quit,
    Clear,
    /// Review the whole workspace, or one file.
    Review(Option<String>),
    Refactor(String),
    Selection {
        path: String,
        start: usize,
        end: usize,
    },
    Explain(String),
    Generate(String),
    Diff,
    Project,
    Config,
    /// Anything that isn't a slash command.
    Message(String),
}

/// Parse one input line. Unknown commands and malformed arguments are
/// errors with a usage hint; plain text is a chat message.
pub fn parse_command(line: &str) -> Result<ChatCommand, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(ChatCommand::Message(line.to_string()));
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "/help" => Ok(ChatCommand::Help),
        "/quit" | "/exit" => Ok(ChatCommand::Quit),
        "/clear" => Ok(ChatCommand::Clear),
        "/review" => Ok(ChatCommand::Review(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "/refactor" => {
            if rest.is_empty() {
                Err("usage: /refactor <path>".to_string())
            } else {
                Ok(ChatCommand::Refactor(rest.to_string()))
            }
        }
        "/selection" => {
            let args: Vec<&str> = rest.split_whitespace().collect();
            match args.as_slice() {
                [path, start, end] => {
                    let start = start
                        .parse()
                        .map_err(|_| format!("invalid start line: {start}"))?;
                    let end = end.parse().map_err(|_| format!("invalid end line: {end}"))?;
                    Ok(ChatCommand::Selection {
                        path: path.to_string(),
                        start,
                        end,
                    })
                }
                _ => Err("usage: /selection <path> <start> <end>".to_string()),
            }
        }
        "/explain" => {
            if rest.is_empty() {
                Err("usage: /explain <path>".to_string())
            } else {
                Ok(ChatCommand::Explain(rest.to_string()))
            }
        }
        "/generate" => {
            if rest.is_empty() {
                Err("usage: /generate <description>".to_string())
            } else {
                Ok(ChatCommand::Generate(rest.to_string()))
            }
        }
        "/diff" => Ok(ChatCommand::Diff),
        "/project" => Ok(ChatCommand::Project),
        "/config" => Ok(ChatCommand::Config),
        other => Err(format!("unknown command: {other} (try /help)")),
    }
}

const HELP: &str = "\
  /review [path]             review the workspace, or one file
  /refactor <path>           ask for a rewrite of one file
  /selection <path> <a> <b>  review lines a-b of a file
  /explain <path>            explain a file
  /generate <description>    generate code from a description
  /diff                      review uncommitted git changes
  /project                   show accumulated project context
  /config                    show the active configuration
  /clear                     forget the conversation history
  /quit                      leave";

/// Send free text to the backend with the session history and record
/// the exchange. Chat output is plain text, so every tag is stripped.
pub async fn chat_reply(session: &Session, message: &str) -> Result<String, crate::backend::BackendError> {
    let config = &session.config().backend;
    let reply = retry::dispatch(
        session.backend().as_ref(),
        message,
        &session.history(),
        config.max_retries,
        Duration::from_millis(config.base_delay_ms),
    )
    .await?;
    let reply = crate::sanitize::sanitize_plain(&reply);
    session.record_exchange(message, &reply);
    Ok(reply)
}

/// Run the interactive loop until `/quit` or EOF.
pub async fn run_chat(session: Arc<Session>) -> std::io::Result<()> {
    println!(
        "{} (backend: {}). Type /help for commands.",
        format!("{} chat", crate::constants::APP_NAME).bold(),
        session.backend().name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message.yellow());
                continue;
            }
        };

        match command {
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Clear => {
                session.clear_history();
                println!("history cleared");
            }
            ChatCommand::Message(text) => match chat_reply(&session, &text).await {
                Ok(reply) => println!("{reply}"),
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            },
            ChatCommand::Review(None) => {
                run_workspace_review(&session).await;
            }
            ChatCommand::Review(Some(path)) => match review::review_file(&session, &path).await {
                Ok(result) => {
                    print!("{}", TerminalRenderer.render(std::slice::from_ref(&result)));
                    offer_apply(&session, &result);
                }
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            },
            ChatCommand::Refactor(path) => match review::refactor_file(&session, &path).await {
                Ok(result) => {
                    println!("{}", result.review);
                    offer_apply(&session, &result);
                }
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            },
            ChatCommand::Selection { path, start, end } => {
                match review::review_selection(&session, &path, start, end).await {
                    Ok(result) => print!("{}", TerminalRenderer.render(&[result])),
                    Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                }
            }
            ChatCommand::Explain(path) => match review::explain_file(&session, &path).await {
                Ok(reply) => println!("{reply}"),
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            },
            ChatCommand::Generate(description) => {
                match review::generate_code(&session, &description).await {
                    Ok((reply, _code)) => println!("{reply}"),
                    Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                }
            }
            ChatCommand::Diff => {
                run_diff_review(&session).await;
            }
            ChatCommand::Project => {
                let context = session.project_context();
                if context.is_empty() {
                    println!("no project context yet — review some files first");
                } else {
                    for (path, summary) in &context {
                        println!("{}: {summary}", path.bold());
                    }
                }
            }
            ChatCommand::Config => match toml::to_string_pretty(session.config()) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            },
        }
    }
    Ok(())
}

async fn run_workspace_review(session: &Arc<Session>) {
    let files = scheduler::enumerate_files(
        session.root(),
        session.filter(),
        session.config().review.max_files,
    );
    let progress = Arc::new(ProgressTracker::new(&files, true));
    progress.start();

    let result = scheduler::run_batch(
        Arc::clone(session),
        Arc::clone(&progress),
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    match result {
        Ok(report) => {
            let summary = crate::models::Summary::from_reviews(&report.reviews);
            progress.finish(summary.issues);
            print!("{}", TerminalRenderer.render(&report.reviews));
            for (path, message) in &report.errors {
                eprintln!("{}", format!("{path}: {message}").red());
            }
            for review in &report.reviews {
                offer_apply(session, review);
            }
        }
        Err(e) => eprintln!("{}", format!("Error: {e}").yellow()),
    }
}

async fn run_diff_review(session: &Arc<Session>) {
    // Changed paths are relative to the repo toplevel, which may sit
    // above the workspace root; resolve it before asking for diffs.
    let repo_root = match gitdiff::find_repo_root(session.root()).await {
        Ok(root) => std::path::PathBuf::from(root),
        Err(e) => {
            eprintln!("{}", format!("Error: {e}").red());
            return;
        }
    };

    let changed = match gitdiff::changed_files(&repo_root).await {
        Ok(changed) => changed,
        Err(e) => {
            eprintln!("{}", format!("Error: {e}").red());
            return;
        }
    };
    if changed.is_empty() {
        println!("no uncommitted changes");
        return;
    }

    let mut reviews = Vec::new();
    for path in changed {
        if !session.filter().includes(Path::new(&path)) {
            continue;
        }
        match gitdiff::file_diff(&repo_root, &path).await {
            Ok(diff) if !diff.is_empty() => {
                match review::review_diff(session, &path, &diff).await {
                    Ok(result) => reviews.push(result),
                    Err(e) => eprintln!("{}", format!("{path}: {e}").red()),
                }
            }
            Ok(_) => {}
            Err(e) => eprintln!("{}", format!("{path}: {e}").red()),
        }
    }
    print!("{}", TerminalRenderer.render(&reviews));
}

/// Run a review's suggestion through the mutation gate, honoring the
/// `auto_apply` setting.
pub fn offer_apply(session: &Session, review: &FileReview) {
    let Some(suggested) = &review.suggested else {
        return;
    };
    let confirm: &dyn Confirm = if session.config().review.auto_apply {
        &AutoConfirm
    } else {
        &TerminalConfirm
    };
    let target = session.root().join(&review.path);
    match apply::apply(&target, &review.original, suggested, confirm) {
        Ok(GateOutcome::Applied { backup }) => {
            session.loader().invalidate(&target);
            println!(
                "{} (backup at {})",
                format!("applied suggestion to {}", review.path).green(),
                backup.display()
            );
        }
        Ok(GateOutcome::Cancelled) => println!("left {} unchanged", review.path),
        Ok(GateOutcome::Unchanged) => {}
        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_command("what does this repo do?").unwrap(),
            ChatCommand::Message("what does this repo do?".to_string())
        );
    }

    #[test]
    fn review_with_and_without_path() {
        assert_eq!(parse_command("/review").unwrap(), ChatCommand::Review(None));
        assert_eq!(
            parse_command("/review src/main.rs").unwrap(),
            ChatCommand::Review(Some("src/main.rs".to_string()))
        );
    }

    #[test]
    fn selection_parses_range() {
        assert_eq!(
            parse_command("/selection src/a.rs 3 10").unwrap(),
            ChatCommand::Selection {
                path: "src/a.rs".to_string(),
                start: 3,
                end: 10
            }
        );
    }

    #[test]
    fn selection_rejects_bad_args() {
        assert!(parse_command("/selection src/a.rs").is_err());
        assert!(parse_command("/selection src/a.rs x y").is_err());
    }

    #[test]
    fn refactor_requires_path() {
        assert!(parse_command("/refactor").is_err());
        assert_eq!(
            parse_command("/refactor a.rs").unwrap(),
            ChatCommand::Refactor("a.rs".to_string())
        );
    }

    #[test]
    fn unknown_command_errors_with_hint() {
        let err = parse_command("/frobnicate").unwrap_err();
        assert!(err.contains("/frobnicate"));
        assert!(err.contains("/help"));
    }

    #[test]
    fn quit_aliases() {
        assert_eq!(parse_command("/quit").unwrap(), ChatCommand::Quit);
        assert_eq!(parse_command("/exit").unwrap(), ChatCommand::Quit);
    }

    #[test]
    fn generate_keeps_full_description() {
        assert_eq!(
            parse_command("/generate a parser for csv files").unwrap(),
            ChatCommand::Generate("a parser for csv files".to_string())
        );
    }

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::backend::{Backend, BackendError};
    use crate::config::Config;
    use crate::models::ChatMessage;

    struct CountingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Backend for CountingBackend {
        fn name(&self) -> String {
            "counting".to_string()
        }

        async fn send(
            &self,
            _prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Line 1: Low severity - nit".to_string())
        }
    }

    async fn git(dir: &Path, args: &[&str]) {
        let out = tokio::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .unwrap();
        assert!(out.status.success(), "git {args:?} failed");
    }

    #[tokio::test]
    async fn diff_review_works_from_a_repo_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path();
        git(top, &["init", "-q"]).await;
        git(top, &["config", "user.email", "t@example.com"]).await;
        git(top, &["config", "user.name", "t"]).await;
        std::fs::create_dir(top.join("sub")).unwrap();
        std::fs::write(top.join("sub/app.ts"), "const a = 1;\n").unwrap();
        git(top, &["add", "."]).await;
        git(top, &["commit", "-q", "-m", "init"]).await;
        std::fs::write(top.join("sub/app.ts"), "const a = 2;\n").unwrap();

        let mut config = Config::default();
        config.review.include = vec!["**/*.ts".to_string()];
        let backend = Arc::new(CountingBackend {
            calls: AtomicU32::new(0),
        });
        let session = Arc::new(Session::with_backend(
            top.join("sub"),
            config,
            backend.clone(),
        ));

        run_diff_review(&session).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
