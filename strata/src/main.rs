use std::borrow::Cow;

use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use strata_core::{
    codegen::{Artifact, DiskWriter, Renderer, TrailingNewline, generate},
    config::{Configuration, PackageMode},
    ir::CodeModel,
    parse::Document,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

mod config;

use self::config::{Command, Generate, Main};

/// Writes each artifact's render context as pretty-printed JSON,
/// next to where the artifact would go.
struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, artifact: &Artifact<'_>) -> Result<String> {
        serde_json::to_string_pretty(&artifact.context).into_diagnostic()
    }

    fn output_path<'b>(&self, artifact: &'b Artifact<'_>) -> Cow<'b, str> {
        Cow::Owned(format!("{}.json", artifact.path))
    }
}

fn main() -> Result<()> {
    let Ok(main) = Main::parse().map_err(|err| err.exit());

    let filter = EnvFilter::builder()
        .with_default_directive(match main.verbose {
            true => LevelFilter::DEBUG.into(),
            false => LevelFilter::WARN.into(),
        })
        .from_env_lossy();
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match main.command {
        Command::Generate(Generate {
            input,
            output,
            options,
        }) => {
            let source = std::fs::read_to_string(&input)
                .into_diagnostic()
                .with_context(|| format!("Failed to read `{}`", input.display()))?;

            let is_json = input
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
            let doc = match is_json {
                true => Document::from_json(&source),
                false => Document::from_yaml(&source),
            }
            .into_diagnostic()
            .context("Failed to parse code model")?;

            let config = Configuration::resolve(options)
                .into_diagnostic()
                .context("Invalid generation options")?;
            if let Some(PackageMode::Template(dir)) = &config.package_mode
                && !dir.is_dir()
            {
                miette::bail!(
                    "package mode `{}` isn't a built-in mode or a template directory",
                    dir.display(),
                );
            }

            let model = CodeModel::new(&doc, config).into_diagnostic()?;
            println!(
                "Code model: `{}` ({} clients, {} models)",
                model.namespace,
                model.clients.len(),
                model.model_types.len(),
            );
            if !model.clients.is_empty() {
                println!(
                    "Clients: {}",
                    model.clients.iter().map(|client| client.name).join(", "),
                );
            }

            println!("Writing generated files to `{}`...", output.display());
            let mut writer = DiskWriter::new(&output);
            generate(&model, &JsonRenderer, &TrailingNewline, &mut writer)?;

            println!("Generation complete");
        }
    }

    Ok(())
}
