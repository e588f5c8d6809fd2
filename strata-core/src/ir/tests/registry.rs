//! Tests for type registry construction and per-type queries.

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    config::Configuration,
    ir::{
        ImportType, ModelBase, NotFoundError, TypeContext, TypeId, TypeNode, TypeRegistry,
        TypeRegistryBuilder, TypeSettings, TypingSection,
    },
    parse::{Document, InputError},
    tests::{WIDGETS, assert_matches},
};

fn msrest() -> Configuration {
    Configuration::resolve([("models-mode", json!("msrest"))]).unwrap()
}

fn build<'a>(doc: &'a Document, config: &Configuration) -> Result<TypeRegistry<'a>, InputError> {
    let root = doc.root();
    let namespace = root.required_str("namespace")?;
    let mut builder = TypeRegistryBuilder::new(TypeSettings::new(namespace, config));
    for ty in root.items("types")? {
        builder.build_type(ty)?;
    }
    builder.finish()
}

fn type_at<'a>(doc: &'a Document, registry: &TypeRegistry<'a>, index: usize) -> TypeId {
    let node = doc.root().items("types").unwrap()[index];
    registry.lookup(node.id()).unwrap()
}

// MARK: Construction

#[test]
fn test_build_type_is_idempotent() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let config = msrest();
    let root = doc.root();
    let mut builder = TypeRegistryBuilder::new(TypeSettings::new("contoso.widgets", &config));

    let widget = root.items("types").unwrap()[0];
    let first = builder.build_type(widget).unwrap();
    let second = builder.build_type(widget).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_mutually_referential_models() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();

    let widget = type_at(&doc, &registry, 0);
    let part = type_at(&doc, &registry, 1);

    // `Widget.parts` is a list of `Part`, and `Part.widget` points
    // back to the same `Widget`.
    let TypeNode::Model(widget_model) = registry.get(widget) else {
        panic!("expected a model; got `{:?}`", registry.get(widget));
    };
    let parts = &widget_model.properties[2];
    assert_matches!(registry.get(parts.ty), TypeNode::List(list) if list.element == part);

    let TypeNode::Model(part_model) = registry.get(part) else {
        panic!("expected a model; got `{:?}`", registry.get(part));
    };
    assert_eq!(part_model.properties[0].ty, widget);
}

#[test]
fn test_self_referential_model() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: model
            name: Node
            properties:
              - clientName: next
                wireName: next
                optional: true
                type:
                  $ref: '#/types/0'
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();

    let node = type_at(&doc, &registry, 0);
    assert_eq!(registry.len(), 1);
    let model = registry.get(node).as_model().unwrap();
    assert_eq!(model.properties[0].ty, node);
}

#[test]
fn test_shared_nodes_build_once() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: string
          - type: list
            elementType:
              $ref: '#/types/0'
          - type: dict
            elementType:
              $ref: '#/types/0'
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();

    assert_eq!(registry.len(), 3);
    let string = type_at(&doc, &registry, 0);
    assert_matches!(registry.get(type_at(&doc, &registry, 1)), TypeNode::List(list) if list.element == string);
    assert_matches!(registry.get(type_at(&doc, &registry, 2)), TypeNode::Dictionary(dict) if dict.element == string);
}

#[test]
fn test_unbounded_cycle_is_rejected() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: list
            elementType:
              $ref: '#/types/0'
    "})
    .unwrap();
    assert_matches!(
        build(&doc, &msrest()),
        Err(InputError::UnboundedTypeCycle(label)) if label == "anonymous list",
    );
}

#[test]
fn test_unknown_type_kind() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: quaternion
    "})
    .unwrap();
    assert_matches!(
        build(&doc, &msrest()),
        Err(InputError::UnknownKind { field: "type", value }) if value == "quaternion",
    );
}

#[test]
fn test_lookup_unbuilt_node() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let client = doc.root().items("clients").unwrap()[0];
    assert_matches!(registry.lookup(client.id()), Err(NotFoundError::Type(_)));
}

#[test]
fn test_models_mode_none_makes_json_models() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let config = Configuration::defaults().unwrap();
    let registry = build(&doc, &config).unwrap();

    let widget = registry.get(type_at(&doc, &registry, 0)).as_model().unwrap();
    assert_eq!(widget.base, ModelBase::Json);
    assert!(!widget.is_public());
}

// MARK: Enums

#[test]
fn test_enum_known_values() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: enum
            name: shape
            valueType:
              type: string
            values:
              - type: enumvalue
                name: CIRCLE
                value: circle
                valueType:
                  type: string
              - type: enumvalue
                name: SQUARE
                value: square
                valueType:
                  type: string
              - type: enumvalue
                name: TRIANGLE
                value: triangle
                valueType:
                  type: string
          - type: enum
            name: level
            valueType:
              type: integer
            values:
              - type: enumvalue
                name: LOW
                value: 1
                valueType:
                  type: integer
              - type: enumvalue
                name: HIGH
                value: 2
                valueType:
                  type: integer
          - type: enum
            name: only
            description: The only option.
            valueType:
              type: string
            values:
              - type: enumvalue
                name: ONE
                value: one
                valueType:
                  type: string
          - type: enum
            name: empty
            valueType:
              type: string
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();

    let shape = registry.view(type_at(&doc, &registry, 0));
    assert_eq!(
        shape.known_values(),
        r#"Known values are: "circle", "square", and "triangle"."#,
    );
    assert_eq!(registry.name(shape.id()), Some("Shape"));

    let level = registry.view(type_at(&doc, &registry, 1));
    assert_eq!(level.known_values(), "Known values are: 1 and 2.");

    let only = registry.view(type_at(&doc, &registry, 2));
    assert_eq!(only.known_values(), r#""one""#);
    assert_eq!(only.description(), r#"The only option. "one""#);

    let empty = registry.view(type_at(&doc, &registry, 3));
    assert_eq!(empty.known_values(), "");
    assert_eq!(empty.description(), "");
}

#[test]
fn test_enum_values_delegate_to_value_type() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();

    let color = registry.get(type_at(&doc, &registry, 2)).as_enum().unwrap();
    let red = registry.view(color.values[0]);
    assert_eq!(red.serialization_type(), "str");
    assert_eq!(red.docstring_type(), "str");
    assert_eq!(red.type_annotation(TypeContext::default()), "Literal[Color.RED]");

    let color = registry.view(type_at(&doc, &registry, 2));
    assert_eq!(color.serialization_type(), "str");
    assert_eq!(
        color.type_annotation(TypeContext::default()),
        r#"Union[str, "_models.Color"]"#,
    );
    assert_eq!(
        color.docstring_type(),
        "str or ~contoso.widgets.models.Color",
    );
}

#[test]
fn test_enum_without_models_is_its_value_type() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &Configuration::defaults().unwrap()).unwrap();
    let color = registry.view(type_at(&doc, &registry, 2));
    assert_eq!(color.type_annotation(TypeContext::default()), "str");
    assert_eq!(color.docstring_type(), "str");
}

// MARK: Annotations

#[test]
fn test_model_annotations() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let widget = registry.view(type_at(&doc, &registry, 0));

    assert_eq!(
        widget.type_annotation(TypeContext::default()),
        r#""_models.Widget""#,
    );
    assert_eq!(
        widget.type_annotation(TypeContext {
            in_operation_file: true,
            ..Default::default()
        }),
        "_models.Widget",
    );
    assert_eq!(widget.serialization_type(), "Widget");
    assert_eq!(widget.docstring_type(), "~contoso.widgets.models.Widget");
}

#[test]
fn test_container_annotations() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let widget = registry.get(type_at(&doc, &registry, 0)).as_model().unwrap();
    let parts = registry.view(widget.properties[2].ty);

    assert_eq!(parts.serialization_type(), "[Part]");
    assert_eq!(parts.docstring_type(), "list[~contoso.widgets.models.Part]");
    assert_eq!(
        parts.type_annotation(TypeContext {
            in_operation_file: true,
            ..Default::default()
        }),
        "List[_models.Part]",
    );
}

#[test]
fn test_json_model_annotation() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &Configuration::defaults().unwrap()).unwrap();
    let widget = registry.view(type_at(&doc, &registry, 0));
    assert_eq!(widget.type_annotation(TypeContext::default()), "JSON");
    assert_eq!(widget.serialization_type(), "object");
}

#[test]
fn test_named_union_annotation() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let union = registry.view(type_at(&doc, &registry, 4));
    assert_eq!(
        union.type_annotation(TypeContext::default()),
        r#""_types.WidgetOrPart""#,
    );
    assert_eq!(
        union.docstring_type(),
        "~contoso.widgets.models.Widget or ~contoso.widgets.models.Part",
    );
}

#[test]
fn test_anonymous_union_annotation() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: combined
            types:
              - type: string
              - type: integer
              - type: string
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let union = registry.view(type_at(&doc, &registry, 0));
    assert_eq!(union.type_annotation(TypeContext::default()), "Union[str, int]");
    assert_eq!(union.docstring_type(), "str or int");
}

#[test]
fn test_datetime_formats() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: datetime
          - type: datetime
            format: rfc7231
          - type: datetime
            encode: unixTimestamp
          - type: duration
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let serialization = (0..4)
        .map(|index| registry.view(type_at(&doc, &registry, index)).serialization_type())
        .collect::<Vec<_>>();
    assert_eq!(serialization, ["iso-8601", "rfc-1123", "unix-time", "duration"]);
    assert_eq!(
        registry
            .view(type_at(&doc, &registry, 0))
            .type_annotation(TypeContext::default()),
        "datetime.datetime",
    );
}

#[test]
fn test_constant_annotation() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: constant
            value: application/json
            valueType:
              type: string
          - type: constant
            value: true
            valueType:
              type: boolean
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let content_type = registry.view(type_at(&doc, &registry, 0));
    assert_eq!(
        content_type.type_annotation(TypeContext::default()),
        r#"Literal["application/json"]"#,
    );
    assert_eq!(content_type.serialization_type(), "str");
    let flag = registry.view(type_at(&doc, &registry, 1));
    assert_eq!(flag.type_annotation(TypeContext::default()), "Literal[True]");
}

// MARK: Unions

#[test]
fn test_target_model_subtype() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let union = registry.get(type_at(&doc, &registry, 4)).as_combined().unwrap();
    assert_eq!(union.target_model_subtype, Some(type_at(&doc, &registry, 0)));
}

#[test]
fn test_target_model_subtype_skips_polymorphic_models() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: model
            name: Fish
            discriminatedSubtypes:
              shark:
                $ref: '#/types/1'
          - type: model
            name: Shark
            discriminatorValue: shark
            parents:
              - $ref: '#/types/0'
          - type: combined
            types:
              - type: string
              - $ref: '#/types/0'
              - $ref: '#/types/1'
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let union = registry.get(type_at(&doc, &registry, 2)).as_combined().unwrap();
    assert_eq!(union.target_model_subtype, Some(type_at(&doc, &registry, 1)));
}

#[test]
fn test_union_without_models_has_no_target() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: combined
            types:
              - type: string
              - type: integer
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let union = registry.get(type_at(&doc, &registry, 0)).as_combined().unwrap();
    assert_eq!(union.target_model_subtype, None);
}

// MARK: Imports

#[test]
fn test_model_list_imports() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let widget = registry.get(type_at(&doc, &registry, 0)).as_model().unwrap();
    let parts = registry.view(widget.properties[2].ty);

    let imports = parts.imports(TypeContext {
        in_operation_file: false,
        root: Some(".."),
        model_typing: true,
    });
    assert_eq!(
        imports.section("typing", Some("List")),
        Some(TypingSection::Conditional),
    );
    assert_eq!(
        imports.section("..", Some("models")),
        Some(TypingSection::Typing),
    );
}

#[test]
fn test_json_model_defines_type() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &Configuration::defaults().unwrap()).unwrap();
    let widget = registry.view(type_at(&doc, &registry, 0));

    let imports = widget.imports(TypeContext::default());
    let list = imports.to_import_list("azure.core");
    assert_eq!(
        list.type_definitions["JSON"].sync.as_str(),
        "MutableMapping[str, Any]",
    );
    assert!(imports.iter().all(|(key, _)| key.import_type != ImportType::Local));
}

#[test]
fn test_datetime_imports() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: dict
            elementType:
              type: date
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let imports = registry
        .view(type_at(&doc, &registry, 0))
        .imports(TypeContext::default());
    assert_eq!(imports.section("datetime", None), Some(TypingSection::Regular));
    assert_eq!(
        imports.section("typing", Some("Dict")),
        Some(TypingSection::Conditional),
    );
}

// MARK: Templates

#[test]
fn test_json_template_of_recursive_model() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let widget = registry.view(type_at(&doc, &registry, 0));
    assert_eq!(
        widget.json_template(),
        json!({
            "name": "str",
            "color": "str",
            "parts": [{"widget": {}}],
        }),
    );
}

#[test]
fn test_json_template_includes_parent_properties() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        types:
          - type: model
            name: Base
            properties:
              - clientName: id
                wireName: id
                type:
                  type: integer
          - type: model
            name: Derived
            parents:
              - $ref: '#/types/0'
            properties:
              - clientName: label
                wireName: label
                type:
                  type: string
    "})
    .unwrap();
    let registry = build(&doc, &msrest()).unwrap();
    let derived = registry.view(type_at(&doc, &registry, 1));
    assert_eq!(derived.json_template(), json!({"id": 0, "label": "str"}));
}
