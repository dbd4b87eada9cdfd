//! Prompt construction: templates, related-file context, and project
//! context assembly.
//!
//! Templates use plain `{placeholder}` interpolation — no control flow.
//! The review template's issue-line wording and the extraction grammar
//! in `review::parser` are a matched pair; change them together.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::Config;
use crate::content::ContentLoader;
use crate::filter::InclusionFilter;

/// The operations that carry their own instruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Review,
    Refactor,
    Explain,
    Generate,
    DiffReview,
}

/// Cap on related-file excerpts included in one prompt.
const MAX_RELATED_FILES: usize = 4;

/// Cap on lines taken from each related file.
const RELATED_EXCERPT_LINES: usize = 60;

const DEFAULT_REVIEW: &str = "Review the code in `{path}` below. Report each issue on its own line \
     in exactly this format:\n\
     Line <number>: <High|Medium|Low|Info> severity - <description>\n\
     If you have a corrected version of the file, provide the complete \
     revised content in a single triple-backtick fenced code block after \
     the issue list.\n\n{content}";

const DEFAULT_REFACTOR: &str = "Refactor the code in `{path}` below to improve clarity and \
     structure without changing behavior. Provide the complete revised \
     content in a single triple-backtick fenced code block, followed by a \
     short summary of the changes.\n\n{content}";

const DEFAULT_EXPLAIN: &str =
    "Explain what the code in `{path}` does, section by section, in plain language:\n\n{content}";

const DEFAULT_GENERATE: &str = "Generate code for the following description. Reply with a single \
     triple-backtick fenced code block and nothing else.\n\n{content}";

const DEFAULT_DIFF_REVIEW: &str = "Review the following diff for `{path}`. Report each issue on its own \
     line in exactly this format:\n\
     Line <number>: <High|Medium|Low|Info> severity - <description>\n\n{content}";

/// Builds instruction strings from templates and workspace context.
pub struct PromptBuilder<'a> {
    config: &'a Config,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// The instruction template for an operation: the user's override
    /// from config when present, else the built-in default.
    fn template(&self, op: Operation) -> &str {
        let t = &self.config.templates;
        let custom = match op {
            Operation::Review => t.review.as_deref(),
            Operation::Refactor => t.refactor.as_deref(),
            Operation::Explain => t.explain.as_deref(),
            Operation::Generate => t.generate.as_deref(),
            Operation::DiffReview => t.diff_review.as_deref(),
        };
        custom.unwrap_or(match op {
            Operation::Review => DEFAULT_REVIEW,
            Operation::Refactor => DEFAULT_REFACTOR,
            Operation::Explain => DEFAULT_EXPLAIN,
            Operation::Generate => DEFAULT_GENERATE,
            Operation::DiffReview => DEFAULT_DIFF_REVIEW,
        })
    }

    /// Build the instruction for an operation over one payload.
    pub fn instruction(&self, op: Operation, path: &str, content: &str) -> String {
        interpolate(self.template(op), path, content)
    }

    /// Build the full file-review prompt: related-file excerpts and
    /// project context first, then the templated instruction.
    pub fn file_review_prompt(
        &self,
        path: &str,
        content: &str,
        related: &[(String, String)],
        project_context: &IndexMap<String, String>,
    ) -> String {
        let mut prompt = String::new();

        if !project_context.is_empty() {
            prompt.push_str("## Project Context\n\n");
            prompt.push_str(
                "Summaries of earlier reviews of other files in this workspace:\n\n",
            );
            for (other, summary) in project_context {
                if other == path {
                    continue;
                }
                prompt.push_str(&format!("### {other}\n{summary}\n\n"));
            }
        }

        if !related.is_empty() {
            prompt.push_str("## Related Files\n\n");
            for (rel_path, excerpt) in related {
                prompt.push_str(&format!("### {rel_path}\n\n```\n{excerpt}\n```\n\n"));
            }
        }

        prompt.push_str(&self.instruction(Operation::Review, path, content));
        prompt
    }
}

/// Plain placeholder substitution.
fn interpolate(template: &str, path: &str, content: &str) -> String {
    template.replace("{path}", path).replace("{content}", content)
}

/// Matches import-like references that name another file.
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:import\s+[^;]*?from\s+['"]([^'"]+)['"]|require\(\s*['"]([^'"]+)['"]\s*\)|#include\s+"([^"]+)"|^\s*mod\s+([A-Za-z_][A-Za-z0-9_]*)\s*;)"#,
    )
    .unwrap()
});

/// Extensions tried when a reference has none.
const CANDIDATE_EXTENSIONS: &[&str] = &["ts", "js", "tsx", "jsx", "rs", "py", "h", "c"];

/// Resolve import/require-like references in `content` to existing,
/// included files and load bounded excerpts of them.
///
/// Returns at most [`MAX_RELATED_FILES`] (relative path, excerpt) pairs.
pub async fn related_files(
    root: &Path,
    file_path: &str,
    content: &str,
    filter: &InclusionFilter,
    loader: &ContentLoader,
) -> Vec<(String, String)> {
    let file_dir = Path::new(file_path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut out = Vec::new();
    for caps in IMPORT_RE.captures_iter(content) {
        if out.len() >= MAX_RELATED_FILES {
            break;
        }
        let reference = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if reference.is_empty() {
            continue;
        }

        let Some(rel) = resolve_reference(root, &file_dir, reference) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().to_string();
        if rel_str == file_path || !filter.includes(&rel) {
            continue;
        }
        if out.iter().any(|(p, _)| *p == rel_str) {
            continue;
        }

        if let Ok(text) = loader.load(&root.join(&rel)).await {
            let excerpt: String = text
                .lines()
                .take(RELATED_EXCERPT_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            out.push((rel_str, excerpt));
        }
    }
    out
}

/// Resolve a reference string to a workspace-relative path that exists
/// on disk, trying candidate extensions when the reference has none.
fn resolve_reference(root: &Path, file_dir: &Path, reference: &str) -> Option<PathBuf> {
    // Bare module names (e.g. package imports) don't resolve to paths.
    let candidate = if reference.starts_with("./") || reference.starts_with("../") {
        file_dir.join(reference)
    } else if reference.contains('/') || reference.ends_with(".h") {
        PathBuf::from(reference)
    } else {
        // Rust `mod name;` resolves as a sibling file.
        file_dir.join(format!("{reference}.rs"))
    };

    let normalized = normalize(&candidate);
    if root.join(&normalized).is_file() {
        return Some(normalized);
    }
    if normalized.extension().is_none() {
        for ext in CANDIDATE_EXTENSIONS {
            let with_ext = normalized.with_extension(ext);
            if root.join(&with_ext).is_file() {
                return Some(with_ext);
            }
        }
    }
    None
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
