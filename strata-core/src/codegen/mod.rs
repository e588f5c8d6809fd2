use std::borrow::Cow;

use itertools::Itertools;
use miette::{Context, IntoDiagnostic};
use tracing::debug;

use crate::ir::CodeModel;

mod context;
mod names;
mod plan;
mod unique;
mod write;

#[cfg(test)]
mod tests;

pub use context::*;
pub use plan::{Artifact, CROSS_LANGUAGE_DEFINITIONS_FILE, plan_artifacts};
pub use unique::UniqueNames;
pub use write::{DiskWriter, MemoryWriter, TrailingNewline};

/// Turns an artifact's render context into text.
pub trait Renderer {
    fn render(&self, artifact: &Artifact<'_>) -> miette::Result<String>;

    /// Returns the path to write the rendered artifact to.
    fn output_path<'b>(&self, artifact: &'b Artifact<'_>) -> Cow<'b, str> {
        Cow::Borrowed(&artifact.path)
    }
}

/// Reformats written files.
pub trait Formatter {
    /// Returns `true` if this formatter handles the file at `path`.
    fn accepts(&self, path: &str) -> bool;

    fn format(&self, path: &str, text: &str) -> miette::Result<String>;
}

/// Persists text files under an output directory. Paths are relative,
/// with `/` separators.
pub trait Writer {
    fn write(&mut self, path: &str, text: &str) -> miette::Result<()>;

    fn exists(&self, path: &str) -> bool;

    /// Lists every file under the output directory, sorted.
    fn list_files(&self) -> miette::Result<Vec<String>>;

    fn read_file(&self, path: &str) -> miette::Result<String>;
}

/// Plans, renders, and writes every artifact for a code model, then
/// runs the formatter over the output.
///
/// Every artifact is rendered before anything is written, so a planning
/// or rendering failure leaves the output untouched. Artifacts that
/// preserve existing files are skipped if their file already exists.
pub fn generate(
    model: &CodeModel<'_>,
    renderer: &impl Renderer,
    formatter: &impl Formatter,
    writer: &mut impl Writer,
) -> miette::Result<()> {
    let artifacts = plan_artifacts(model).into_diagnostic()?;

    let rendered = artifacts
        .iter()
        .map(|artifact| {
            let path = renderer.output_path(artifact);
            let text = renderer
                .render(artifact)
                .with_context(|| format!("Failed to render `{path}`"))?;
            Ok((path, artifact.preserve_existing, text))
        })
        .collect::<miette::Result<Vec<_>>>()?;

    let mut written = 0;
    for (path, preserve_existing, text) in &rendered {
        if *preserve_existing && writer.exists(path) {
            debug!(%path, "keeping existing file");
            continue;
        }
        writer.write(path, text)?;
        written += 1;
    }
    debug!(written, skipped = rendered.len() - written, "wrote artifacts");

    let files = writer
        .list_files()?
        .into_iter()
        .filter(|path| formatter.accepts(path))
        .collect_vec();
    for path in &files {
        let text = writer.read_file(path)?;
        let formatted = formatter
            .format(path, &text)
            .with_context(|| format!("Failed to format `{path}`"))?;
        if formatted != text {
            writer.write(path, &formatted)?;
        }
    }
    debug!(formatted = files.len(), "formatted output");

    Ok(())
}
