//! Names that have to be unique across everything one plan emits.

use heck::ToSnakeCase;
use rustc_hash::FxHashMap;

use crate::{
    config::BuildersVisibility,
    ir::{Client, CodeModel, OperationGroup, RequestBuilderDef},
    parse::NodeId,
};

use super::unique::UniqueNames;

/// Operation group class names and request builder function names,
/// deduplicated across clients.
///
/// Every group class is exported from one operations package, so class
/// names are unique across the whole plan. Request builders only have
/// to be unique within the module they're written to.
#[derive(Debug, Default)]
pub struct EmittedNames<'a> {
    classes: FxHashMap<NodeId<'a>, String>,
    builders: FxHashMap<NodeId<'a>, String>,
}

/// The module that a request builder is written to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum BuilderScope<'a> {
    /// The combined operations file.
    Operations,
    /// The operations file of one group.
    Group(NodeId<'a>),
    /// A request builder module, shared by same-named groups
    /// across clients.
    Rest(String),
}

impl<'a> EmittedNames<'a> {
    pub fn new(model: &CodeModel<'a>) -> Self {
        let config = &model.config;
        let embedded = config.builders_visibility == BuildersVisibility::Embedded;

        let mut class_names = UniqueNames::new();
        let mut classes = FxHashMap::default();
        let mut scopes = FxHashMap::<BuilderScope<'a>, UniqueNames>::default();
        let mut builders = FxHashMap::default();
        for client in &model.clients {
            for group in client.groups() {
                if is_emitted(client, group) {
                    let name = class_names.uniquify(&default_class_name(client, group)).into_owned();
                    classes.insert(group.id, name);
                }

                let scope = match (embedded, config.combine_operation_files) {
                    (true, true) => BuilderScope::Operations,
                    (true, false) => BuilderScope::Group(group.id),
                    (false, _) => BuilderScope::Rest(group.identify_name.to_snake_case()),
                };
                let names = scopes.entry(scope).or_default();
                for builder in client.group_request_builders(group) {
                    let name = names.uniquify(&builder.def().name).into_owned();
                    for overload in builder.overloads() {
                        builders.insert(overload.id, name.clone());
                    }
                    builders.insert(builder.def().id, name);
                }
            }
        }
        Self { classes, builders }
    }

    /// Returns the class name of an operation group. The mixin group's
    /// class is named after its client.
    pub fn class_name(&self, client: &Client<'a>, group: &OperationGroup<'a>) -> String {
        self.classes
            .get(&group.id)
            .cloned()
            .unwrap_or_else(|| default_class_name(client, group))
    }

    pub fn builder_name(&self, def: &RequestBuilderDef<'a>) -> String {
        self.builders
            .get(&def.id)
            .cloned()
            .unwrap_or_else(|| def.name.clone())
    }
}

/// Returns the groups of `client` that get operation classes:
/// every group except mixin groups nested under other groups.
pub(super) fn emitted_groups<'c, 'a>(client: &'c Client<'a>) -> Vec<&'c OperationGroup<'a>> {
    client
        .groups()
        .filter(|group| is_emitted(client, group))
        .collect()
}

fn is_emitted(client: &Client<'_>, group: &OperationGroup<'_>) -> bool {
    !group.is_mixin() || client.operation_groups.iter().any(|top| top.id == group.id)
}

fn default_class_name(client: &Client<'_>, group: &OperationGroup<'_>) -> String {
    if group.class_name.is_empty() {
        format!("{}OperationsMixin", client.name)
    } else {
        group.class_name.to_owned()
    }
}
