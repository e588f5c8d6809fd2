use miette::miette;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    codegen::{Artifact, MemoryWriter, Renderer, TrailingNewline, Writer, generate},
    config::Configuration,
    ir::CodeModel,
    parse::Document,
    tests::WIDGETS,
};

/// Renders the artifact kind and module, with trailing whitespace
/// for the formatter to strip.
struct OutlineRenderer;

impl Renderer for OutlineRenderer {
    fn render(&self, artifact: &Artifact<'_>) -> miette::Result<String> {
        Ok(format!(
            "# {}  \n{}\n\n",
            artifact.context.body.kind(),
            artifact.context.module,
        ))
    }
}

struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&self, artifact: &Artifact<'_>) -> miette::Result<String> {
        match artifact.context.body.kind() {
            "client" => Err(miette!("can't render clients")),
            kind => Ok(kind.to_owned()),
        }
    }
}

fn widgets_model(doc: &Document) -> CodeModel<'_> {
    let config = Configuration::resolve([("no-async", json!(true))]).unwrap();
    CodeModel::new(doc, config).unwrap()
}

#[test]
fn test_generate_writes_and_formats() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = widgets_model(&doc);
    let mut writer = MemoryWriter::new();
    generate(&model, &OutlineRenderer, &TrailingNewline, &mut writer).unwrap();

    assert_eq!(writer.files.len(), 12);
    assert_eq!(
        writer.files["contoso/widgets/_client.py"],
        "# client\ncontoso.widgets._client\n",
    );
    // Files the formatter doesn't accept are written as rendered.
    assert_eq!(
        writer.files["contoso/widgets/py.typed"],
        "# py-typed  \ncontoso.widgets\n\n",
    );
}

#[test]
fn test_generate_keeps_existing_patch_files() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = widgets_model(&doc);
    let mut writer = MemoryWriter::new();
    writer
        .write("contoso/widgets/_patch.py", "__all__ = []  ")
        .unwrap();
    writer
        .write("contoso/widgets/_version.py", "VERSION = \"9.9.9\"\n")
        .unwrap();
    generate(&model, &OutlineRenderer, &TrailingNewline, &mut writer).unwrap();

    // The existing patch file is kept, but still formatted.
    assert_eq!(writer.files["contoso/widgets/_patch.py"], "__all__ = []\n");
    // Without `keep-version-file`, the version file is replaced.
    assert_eq!(
        writer.files["contoso/widgets/_version.py"],
        "# version\ncontoso.widgets._version\n",
    );
    assert_eq!(
        writer.files["contoso/widgets/operations/_patch.py"],
        "# patch\ncontoso.widgets.operations._patch\n",
    );
}

#[test]
fn test_generate_writes_nothing_on_render_failure() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = widgets_model(&doc);
    let mut writer = MemoryWriter::new();

    let err = generate(&model, &FailingRenderer, &TrailingNewline, &mut writer).unwrap_err();
    assert_eq!(err.to_string(), "Failed to render `contoso/widgets/_client.py`");
    assert!(writer.files.is_empty());
}
