//! Tests for building clients, linking long-running operations,
//! and deriving request builders.

use itertools::Itertools;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    config::{Configuration, Flavor},
    error::GenerateError,
    ir::{
        CodeModel, NotFoundError, OperationKind, RequestBuilder, StatusCode,
        UnsupportedCombinationError,
    },
    parse::{Document, Node},
    tests::{WIDGETS, assert_matches},
};

fn operation_node<'a>(doc: &'a Document, group: usize, operation: usize) -> Node<'a> {
    let client = doc.root().items("clients").unwrap()[0];
    let group = client.items("operationGroups").unwrap()[group];
    group.items("operations").unwrap()[operation]
}

// MARK: Groups

#[test]
fn test_groups_and_mixin() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    assert_eq!(client.name, "WidgetClient");
    assert!(client.has_mixin());
    assert!(client.has_lro_operations());
    assert!(client.has_paging_operations());
    assert!(!client.has_abstract_operations());

    let mixin = client.mixin_group().unwrap();
    let names = mixin
        .operations
        .iter()
        .map(|&index| client.operation(index).name)
        .collect_vec();
    assert_matches!(&*names, ["get_status"]);

    let groups = client
        .groups()
        .map(|group| group.identify_name)
        .collect_vec();
    assert_matches!(&*groups, ["", "widgets"]);
}

#[test]
fn test_api_versions_in_first_seen_order() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let widgets = &client.operation_groups[1];
    assert_matches!(
        &*widgets.api_versions.iter().copied().collect_vec(),
        ["2024-01-01", "2024-06-01"],
    );
    assert_matches!(
        &*client.api_versions.iter().copied().collect_vec(),
        ["2024-01-01", "2024-06-01"],
    );
}

#[test]
fn test_nested_groups_are_visited_breadth_first() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        clients:
          - name: Client
            operationGroups:
              - identifyName: outer
                operationGroups:
                  - identifyName: inner
                    operations:
                      - name: deep
                        apiVersions: ['2023-01-01']
              - identifyName: sibling
                operations:
                  - name: shallow
                    apiVersions: ['2022-01-01']
    "})
    .unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let groups = client
        .groups()
        .map(|group| group.identify_name)
        .collect_vec();
    assert_matches!(&*groups, ["outer", "sibling", "inner"]);
    assert_matches!(
        &*client.api_versions.iter().copied().collect_vec(),
        ["2022-01-01", "2023-01-01"],
    );
}

// MARK: Operations

#[test]
fn test_operation_kinds() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let kinds = client
        .operations()
        .iter()
        .map(|op| op.kind.as_str())
        .collect_vec();
    assert_matches!(&*kinds, ["basic", "basic", "basic", "lro", "paging"]);

    let list = client
        .operations()
        .iter()
        .find(|op| op.name == "list_widgets")
        .unwrap();
    let paging = list.kind.paging().unwrap();
    assert_eq!(paging.item_name, "value");
    assert_eq!(paging.next_link_name, Some("nextLink"));
    let widget = model
        .types
        .lookup(doc.root().items("types").unwrap()[0].id())
        .unwrap();
    assert_eq!(paging.item_type, Some(widget));
}

#[test]
fn test_status_codes() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let get = client
        .operations()
        .iter()
        .find(|op| op.name == "get_widget")
        .unwrap();
    assert_eq!(get.responses[0].status_codes, [StatusCode::Code(200)]);
    assert_eq!(get.exceptions[0].status_codes, [StatusCode::Default]);
    assert!(get.response_type().is_some());
}

// MARK: Long-running operations

#[test]
fn test_lro_links_to_initial_operation() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let begin = client
        .lookup_operation(operation_node(&doc, 1, 2).id())
        .unwrap();
    let initial = client
        .lookup_operation(operation_node(&doc, 1, 1).id())
        .unwrap();
    let lro = client.operation(begin).kind.lro().unwrap();
    assert_eq!(lro.initial_operation, Some(initial));
    assert!(client.operation(initial).is_lro_initial);

    // The long-running operation reuses its initial
    // operation's request builder.
    assert_eq!(
        client.operation(begin).request_builder,
        client.operation(initial).request_builder,
    );
    assert!(client.operation(begin).request_builder.is_some());
}

#[test]
fn test_lro_links_across_groups() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        clients:
          - name: Client
            operationGroups:
              - identifyName: pollers
                operations:
                  - name: begin_delete
                    discriminator: lro
                    initialOperation:
                      $ref: '#/clients/0/operationGroups/1/operations/0'
              - identifyName: raw
                operations:
                  - name: _delete_initial
                    method: DELETE
    "})
    .unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let begin = client
        .lookup_operation(operation_node(&doc, 0, 0).id())
        .unwrap();
    let initial = client
        .lookup_operation(operation_node(&doc, 1, 0).id())
        .unwrap();
    assert_eq!(
        client.operation(begin).kind.lro().unwrap().initial_operation,
        Some(initial),
    );
}

#[test]
fn test_lro_without_initial_operation() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        clients:
          - name: Client
            operationGroups:
              - identifyName: widgets
                operations:
                  - name: begin_create
                    discriminator: lro
    "})
    .unwrap();
    assert_matches!(
        CodeModel::new(&doc, Configuration::defaults().unwrap()),
        Err(GenerateError::NotFound(NotFoundError::InitialOperation { client, operation }))
            if client == "Client" && operation == "begin_create",
    );
}

#[test]
fn test_lro_for_unbranded_flavor() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let config = Configuration::resolve([("flavor", json!("unbranded"))]).unwrap();
    assert_matches!(
        CodeModel::new(&doc, config),
        Err(GenerateError::UnsupportedCombination(UnsupportedCombinationError {
            flavor: Flavor::Unbranded,
            ..
        })),
    );
}

// MARK: Request builders

#[test]
fn test_request_builder_names() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    let names = client
        .request_builders()
        .iter()
        .map(|builder| builder.def().name.as_str())
        .collect_vec();
    assert_matches!(
        &*names,
        [
            "build_get_status_request",
            "build_widgets_get_widget_request",
            "build_widgets_create_initial_request",
            "build_widgets_list_widgets_request",
        ],
    );
}

#[test]
fn test_request_builder_names_without_combined_files() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let config = Configuration::resolve([("combine-operation-files", json!(false))]).unwrap();
    let model = CodeModel::new(&doc, config).unwrap();
    let client = &model.clients[0];

    let widgets = &client.operation_groups[1];
    let names = client
        .group_request_builders(widgets)
        .map(|builder| builder.def().name.as_str())
        .collect_vec();
    assert_matches!(
        &*names,
        [
            "build_get_widget_request",
            "build_create_initial_request",
            "build_list_widgets_request",
        ],
    );
}

#[test]
fn test_builder_operations_skip_lro_and_abstract() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        clients:
          - name: Client
            operationGroups:
              - identifyName: widgets
                operations:
                  - name: _create_initial
                    isLroInitialOperation: true
                  - name: begin_create
                    discriminator: lro
                    initialOperation:
                      $ref: '#/clients/0/operationGroups/0/operations/0'
                  - name: upload
                    abstract: true
                  - name: get
    "})
    .unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];
    assert!(client.has_abstract_operations());

    let group = &client.operation_groups[0];
    let names = client
        .builder_operations(group)
        .map(|op| op.name)
        .collect_vec();
    assert_matches!(&*names, ["_create_initial", "get"]);
    assert_eq!(client.request_builders().len(), 2);

    let upload = client
        .lookup_operation(operation_node(&doc, 0, 2).id())
        .unwrap();
    assert_eq!(client.operation(upload).request_builder, None);
    assert_matches!(
        client.lookup_request_builder(operation_node(&doc, 0, 2).id()),
        Err(NotFoundError::RequestBuilder(_)),
    );
}

#[test]
fn test_overloaded_request_builder() {
    let doc = Document::from_yaml(indoc::indoc! {"
        namespace: test
        clients:
          - name: Client
            operationGroups:
              - identifyName: ''
                operations:
                  - name: upload
                    method: POST
                    overloads:
                      - name: upload
                        method: POST
                        description: Uploads JSON.
                      - name: upload
                        method: POST
                        description: Uploads bytes.
    "})
    .unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];

    // Overloads are operations, but aren't listed in any group.
    assert_eq!(client.operations().len(), 3);
    assert_eq!(client.mixin_group().unwrap().operations.len(), 1);

    let upload = operation_node(&doc, 0, 0);
    let index = client.lookup_request_builder(upload.id()).unwrap();
    let RequestBuilder::Overloaded { builder, overloads } = client.request_builder(index) else {
        panic!(
            "expected an overloaded builder; got `{:?}`",
            client.request_builder(index),
        );
    };
    assert_eq!(builder.name, "build_upload_request");
    assert_eq!(overloads.len(), 2);

    let overload = upload.items("overloads").unwrap()[1];
    assert_eq!(client.lookup_request_builder(overload.id()).unwrap(), index);
    let overload = client.lookup_operation(upload.id()).unwrap();
    assert!(client.operation(overload).overloads.iter().all(|&index| {
        let op = client.operation(index);
        op.is_overload && op.request_builder.is_none()
    }));
}

#[test]
fn test_basic_kind_has_no_lro_or_paging() {
    let doc = Document::from_yaml(WIDGETS).unwrap();
    let model = CodeModel::new(&doc, Configuration::defaults().unwrap()).unwrap();
    let client = &model.clients[0];
    let status = client
        .lookup_operation(operation_node(&doc, 0, 0).id())
        .unwrap();
    assert_matches!(client.operation(status).kind, OperationKind::Basic);
}
