//! Render contexts: the structured data handed to a
//! [`Renderer`](super::Renderer) for one artifact.
//!
//! Contexts are plain, serializable snapshots. They borrow names and
//! descriptions from the code model, but never the type registry itself,
//! so a renderer can't reach back into shared state.

use std::rc::Rc;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{BuildersVisibility, Configuration},
    ir::{
        Client, CodeModel, FileImport, ImportList, ImportType, ModelBase, Operation,
        OperationGroup, OperationIndex, Parameter, ParameterLocation, RequestBuilder,
        RequestBuilderDef, StatusCode, TypeContext, TypeId, TypeNode, TypingSection, declaration,
    },
};

use super::names::EmittedNames;

/// Everything a renderer needs for one artifact.
#[derive(Debug, Serialize)]
pub struct RenderContext<'m> {
    pub namespace: &'m str,
    /// The dotted module that the artifact defines.
    pub module: String,
    pub async_mode: bool,
    pub imports: ImportList,
    pub config: &'m Configuration,
    #[serde(flatten)]
    pub body: ArtifactBody<'m>,
}

/// The artifact-specific part of a [`RenderContext`].
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArtifactBody<'m> {
    PackageInit {
        clients: Vec<&'m str>,
        has_version: bool,
    },
    Version {
        version: &'m str,
    },
    Configuration {
        clients: Vec<ClientContext<'m>>,
    },
    Client {
        client: ClientContext<'m>,
    },
    Types {
        unions: Vec<UnionContext<'m>>,
    },
    Vendor {
        mixin_clients: Vec<&'m str>,
        has_abstract_operations: bool,
    },
    Patch,
    PyTyped,
    /// The serializer and deserializer that clients, request builders,
    /// and `msrest` models share.
    Serialization,
    /// The base class for `dpg` models.
    ModelBase,
    /// Client-side parameter validation helpers.
    Validation,
    /// Generated names mapped to their cross-language definition IDs.
    CrossLanguageDefinitions {
        package_id: Option<&'m str>,
        definitions: IndexMap<String, &'m str>,
    },
    ModelsInit {
        models: Vec<&'m str>,
        enums: Vec<&'m str>,
    },
    Models {
        models: Vec<ModelContext<'m>>,
    },
    Enums {
        enums: Vec<EnumContext<'m>>,
    },
    OperationsInit {
        groups: Vec<GroupExport>,
    },
    Operations {
        groups: Vec<GroupContext<'m>>,
        /// Request builders defined in this file, when builders
        /// are embedded.
        request_builders: Vec<RequestBuilderContext<'m>>,
    },
    RequestBuildersInit {
        request_builders: Vec<String>,
        groups: Vec<String>,
    },
    RequestBuilders {
        request_builders: Vec<RequestBuilderContext<'m>>,
    },
}

impl ArtifactBody<'_> {
    /// Returns a short name for this kind of artifact.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PackageInit { .. } => "package-init",
            Self::Version { .. } => "version",
            Self::Configuration { .. } => "configuration",
            Self::Client { .. } => "client",
            Self::Types { .. } => "types",
            Self::Vendor { .. } => "vendor",
            Self::Patch => "patch",
            Self::PyTyped => "py-typed",
            Self::Serialization => "serialization",
            Self::ModelBase => "model-base",
            Self::Validation => "validation",
            Self::CrossLanguageDefinitions { .. } => "cross-language-definitions",
            Self::ModelsInit { .. } => "models-init",
            Self::Models { .. } => "models",
            Self::Enums { .. } => "enums",
            Self::OperationsInit { .. } => "operations-init",
            Self::Operations { .. } => "operations",
            Self::RequestBuildersInit { .. } => "request-builders-init",
            Self::RequestBuilders { .. } => "request-builders",
        }
    }
}

/// How one type is written in one artifact.
#[derive(Clone, Debug, Serialize)]
pub struct TypeStrings {
    pub type_annotation: String,
    pub docstring_type: String,
    pub serialization_type: String,
}

#[derive(Debug, Serialize)]
pub struct ModelContext<'m> {
    pub name: &'m str,
    pub description: Option<&'m str>,
    pub base: ModelBase,
    pub parents: Vec<&'m str>,
    pub properties: Vec<PropertyContext<'m>>,
    /// The wire name of the discriminator property.
    pub discriminator: Option<&'m str>,
    pub discriminator_value: Option<&'m str>,
    /// Subtype names, keyed by discriminator value.
    pub subtypes: IndexMap<&'m str, &'m str>,
    pub is_error: bool,
    pub cross_language_definition_id: Option<&'m str>,
}

#[derive(Debug, Serialize)]
pub struct PropertyContext<'m> {
    pub client_name: &'m str,
    pub wire_name: &'m str,
    #[serde(flatten)]
    pub ty: TypeStrings,
    pub description: Option<&'m str>,
    pub optional: bool,
    pub readonly: bool,
    pub is_discriminator: bool,
    pub flatten: bool,
}

#[derive(Debug, Serialize)]
pub struct EnumContext<'m> {
    pub name: &'m str,
    pub description: String,
    pub value_type: String,
    pub values: Vec<EnumValueContext<'m>>,
    pub cross_language_definition_id: Option<&'m str>,
}

#[derive(Debug, Serialize)]
pub struct EnumValueContext<'m> {
    pub name: &'m str,
    /// The value as written in source.
    pub value: String,
    pub description: Option<&'m str>,
}

#[derive(Debug, Serialize)]
pub struct UnionContext<'m> {
    pub name: &'m str,
    pub description: Option<&'m str>,
    /// The members, as one annotation.
    pub annotation: String,
}

#[derive(Debug, Serialize)]
pub struct ParameterContext<'m> {
    pub client_name: &'m str,
    pub wire_name: &'m str,
    pub location: ParameterLocation,
    #[serde(flatten)]
    pub ty: TypeStrings,
    pub optional: bool,
    pub description: Option<&'m str>,
    pub in_method: bool,
    pub is_api_version: bool,
}

#[derive(Debug, Serialize)]
pub struct PagingContext<'m> {
    pub item_name: &'m str,
    pub next_link_name: Option<&'m str>,
    pub item_type: Option<TypeStrings>,
}

#[derive(Debug, Serialize)]
pub struct OperationContext<'m> {
    pub name: &'m str,
    pub kind: &'static str,
    pub description: Option<&'m str>,
    pub method: &'m str,
    pub url: &'m str,
    pub api_versions: Vec<&'m str>,
    pub parameters: Vec<ParameterContext<'m>>,
    pub response_type: Option<TypeStrings>,
    pub status_codes: Vec<StatusCode>,
    pub exceptions: Vec<StatusCode>,
    pub request_builder: Option<String>,
    pub initial_operation: Option<&'m str>,
    pub paging: Option<PagingContext<'m>>,
    pub overloads: Vec<OperationContext<'m>>,
    pub is_overload: bool,
    pub is_abstract: bool,
    pub is_lro_initial: bool,
    pub internal: bool,
    pub want_tracing: bool,
    /// A sample of the JSON body, for docstrings. Only set when models
    /// aren't generated and the body is an object or array.
    pub json_input_template: Option<Value>,
    /// A sample of the JSON response, like `json_input_template`.
    pub json_response_template: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct GroupContext<'m> {
    pub class_name: String,
    pub property_name: &'m str,
    pub client_name: &'m str,
    pub is_mixin: bool,
    pub api_versions: Vec<&'m str>,
    pub operations: Vec<OperationContext<'m>>,
    /// Nested groups, exposed as properties of this group.
    pub groups: Vec<ClientGroupContext<'m>>,
}

/// A group class that a package `__init__` re-exports.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GroupExport {
    pub class_name: String,
    /// The module that defines the class, relative to the package.
    pub module: String,
}

#[derive(Debug, Serialize)]
pub struct ClientContext<'m> {
    pub name: &'m str,
    pub description: Option<&'m str>,
    pub url: Option<&'m str>,
    pub config_class: String,
    pub parameters: Vec<ParameterContext<'m>>,
    pub api_versions: Vec<&'m str>,
    /// Named groups, exposed as client properties.
    pub groups: Vec<ClientGroupContext<'m>>,
    pub mixin_class: Option<String>,
    pub has_lro_operations: bool,
    pub has_paging_operations: bool,
}

#[derive(Debug, Serialize)]
pub struct ClientGroupContext<'m> {
    pub class_name: String,
    pub property_name: &'m str,
}

#[derive(Debug, Serialize)]
pub struct RequestBuilderContext<'m> {
    pub name: String,
    pub method: &'m str,
    pub url: &'m str,
    pub parameters: Vec<ParameterContext<'m>>,
    pub overloads: Vec<RequestBuilderContext<'m>>,
}

/// Assembles the contexts for one artifact, and collects the imports
/// they need as it goes.
pub(super) struct ContextBuilder<'m, 'a> {
    model: &'m CodeModel<'a>,
    names: Rc<EmittedNames<'a>>,
    /// The relative path from the artifact's package to the root package.
    root: String,
    async_mode: bool,
    in_operation_file: bool,
    model_typing: bool,
    imports: FileImport,
}

impl<'m, 'a> ContextBuilder<'m, 'a> {
    pub(super) fn new(
        model: &'m CodeModel<'a>,
        names: Rc<EmittedNames<'a>>,
        root: String,
        async_mode: bool,
    ) -> Self {
        Self {
            model,
            names,
            root,
            async_mode,
            in_operation_file: false,
            model_typing: true,
            imports: FileImport::new(),
        }
    }

    /// Writes model references unquoted, and imports models at run time.
    pub(super) fn in_operation_file(mut self) -> Self {
        self.in_operation_file = true;
        self.model_typing = false;
        self
    }

    #[inline]
    pub(super) fn imports(&mut self) -> &mut FileImport {
        &mut self.imports
    }

    /// Returns the relative path to the root package, like `..`.
    #[inline]
    pub(super) fn root(&self) -> &str {
        &self.root
    }

    /// Returns the relative path to the package that holds this
    /// artifact's client: the root package, or `aio` under it.
    pub(super) fn client_root(&self) -> &str {
        if self.async_mode {
            &self.root[1..]
        } else {
            &self.root
        }
    }

    pub(super) fn finish(self, module: String, body: ArtifactBody<'m>) -> RenderContext<'m> {
        let config = &self.model.config;
        RenderContext {
            namespace: self.model.namespace,
            module,
            async_mode: self.async_mode,
            imports: self.imports.to_import_list(config.core_library()),
            config,
            body,
        }
    }

    /// Describes a type, and records what it needs imported.
    pub(super) fn ty(&mut self, id: TypeId) -> TypeStrings {
        let code = self.model;
        let view = code.types.view(id);
        let cx = TypeContext {
            in_operation_file: self.in_operation_file,
            root: Some(&self.root),
            model_typing: self.model_typing,
        };
        self.imports.merge(&view.imports(cx));
        TypeStrings {
            type_annotation: view.type_annotation(cx),
            docstring_type: view.docstring_type(),
            serialization_type: view.serialization_type(),
        }
    }

    pub(super) fn model(&mut self, id: TypeId) -> Option<ModelContext<'m>> {
        let code = self.model;
        let types = &code.types;
        let model = types.get(id).as_model()?;
        let properties = model
            .properties
            .iter()
            .map(|property| PropertyContext {
                client_name: property.client_name,
                wire_name: property.wire_name,
                ty: self.ty(property.ty),
                description: property.description,
                optional: property.optional,
                readonly: property.readonly,
                is_discriminator: property.is_discriminator,
                flatten: property.flatten,
            })
            .collect();
        Some(ModelContext {
            name: model.name,
            description: model.description,
            base: model.base,
            parents: model
                .parents
                .iter()
                .filter_map(|&parent| types.name(parent))
                .collect(),
            properties,
            discriminator: model.discriminator().map(|property| property.wire_name),
            discriminator_value: model.discriminator_value,
            subtypes: model
                .discriminated_subtypes
                .iter()
                .filter_map(|(&value, &subtype)| Some((value, types.name(subtype)?)))
                .collect(),
            is_error: model.is_error(),
            cross_language_definition_id: model.cross_language_definition_id,
        })
    }

    pub(super) fn enum_(&mut self, id: TypeId) -> Option<EnumContext<'m>> {
        let code = self.model;
        let types = &code.types;
        let ty = types.get(id).as_enum()?;
        let values = ty
            .values
            .iter()
            .filter_map(|&value| match types.get(value) {
                TypeNode::EnumValue(value) => Some(EnumValueContext {
                    name: value.name,
                    value: declaration(value.value),
                    description: value.description,
                }),
                _ => None,
            })
            .collect();
        Some(EnumContext {
            name: &ty.name,
            description: types.view(id).description(),
            value_type: self.ty(ty.value_type).type_annotation,
            values,
            cross_language_definition_id: ty.cross_language_definition_id,
        })
    }

    pub(super) fn union(&mut self, id: TypeId) -> Option<UnionContext<'m>> {
        let code = self.model;
        let ty = code.types.get(id).as_combined()?;
        let name = ty.name?;
        let members = ty
            .types
            .iter()
            .map(|&member| self.ty(member).type_annotation)
            .unique()
            .collect_vec();
        let annotation = match &*members {
            [member] => member.clone(),
            members => {
                self.imports.add_submodule_import(
                    "typing",
                    "Union",
                    ImportType::Stdlib,
                    TypingSection::Conditional,
                );
                format!("Union[{}]", members.join(", "))
            }
        };
        Some(UnionContext {
            name,
            description: ty.description,
            annotation,
        })
    }

    pub(super) fn parameter(&mut self, parameter: &'m Parameter<'a>) -> ParameterContext<'m> {
        if parameter.optional {
            self.add_typing("Optional");
        }
        ParameterContext {
            client_name: parameter.client_name,
            wire_name: parameter.wire_name,
            location: parameter.location,
            ty: self.ty(parameter.ty),
            optional: parameter.optional,
            description: parameter.description,
            in_method: parameter.in_method,
            is_api_version: parameter.is_api_version,
        }
    }

    pub(super) fn client(&mut self, client: &'m Client<'a>) -> ClientContext<'m> {
        self.add_typing("Any");
        let parameters = client
            .parameters
            .iter()
            .map(|parameter| self.parameter(parameter))
            .collect();
        ClientContext {
            name: client.name,
            description: client.description,
            url: client.url,
            config_class: format!("{}Configuration", client.name),
            parameters,
            api_versions: client.api_versions.iter().copied().collect(),
            groups: self.child_groups(client, &client.operation_groups),
            mixin_class: client
                .mixin_group()
                .map(|group| self.names.class_name(client, group)),
            has_lro_operations: client.has_lro_operations(),
            has_paging_operations: client.has_paging_operations(),
        }
    }

    pub(super) fn group(
        &mut self,
        client: &'m Client<'a>,
        group: &'m OperationGroup<'a>,
    ) -> GroupContext<'m> {
        if group.is_mixin() {
            let vendor = format!("{}_vendor", self.client_root());
            self.imports.add_submodule_import(
                &vendor,
                &format!("{}MixinABC", client.name),
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        let operations = group
            .operations
            .iter()
            .map(|&index| self.operation(client, index))
            .collect();
        GroupContext {
            class_name: self.names.class_name(client, group),
            property_name: group.property_name,
            client_name: client.name,
            is_mixin: group.is_mixin(),
            api_versions: group.api_versions.iter().copied().collect(),
            operations,
            groups: self.child_groups(client, &group.operation_groups),
        }
    }

    /// Describes the named groups in `groups`. Mixin groups aren't
    /// exposed as properties.
    fn child_groups(
        &self,
        client: &'m Client<'a>,
        groups: &'m [OperationGroup<'a>],
    ) -> Vec<ClientGroupContext<'m>> {
        groups
            .iter()
            .filter(|group| !group.is_mixin())
            .map(|group| ClientGroupContext {
                class_name: self.names.class_name(client, group),
                property_name: group.property_name,
            })
            .collect()
    }

    pub(super) fn operation(
        &mut self,
        client: &'m Client<'a>,
        index: OperationIndex,
    ) -> OperationContext<'m> {
        let op = client.operation(index);
        self.operation_imports(client, op);

        let parameters = op
            .parameters
            .iter()
            .filter(|parameter| parameter.in_method)
            .map(|parameter| self.parameter(parameter))
            .collect();
        let response_type = op.response_type().map(|ty| self.ty(ty));
        let paging = op.kind.paging().map(|paging| PagingContext {
            item_name: paging.item_name,
            next_link_name: paging.next_link_name,
            item_type: paging.item_type.map(|ty| self.ty(ty)),
        });
        let initial_operation = op
            .kind
            .lro()
            .and_then(|lro| lro.initial_operation)
            .map(|initial| client.operation(initial).name);
        let overloads = op
            .overloads
            .iter()
            .map(|&overload| self.operation(client, overload))
            .collect();
        let json_input_template = op
            .parameters
            .iter()
            .find(|parameter| parameter.location == ParameterLocation::Body)
            .and_then(|body| self.json_template(body.ty));
        let json_response_template = op.response_type().and_then(|ty| self.json_template(ty));

        OperationContext {
            name: op.name,
            kind: op.kind.as_str(),
            description: op.description,
            method: op.method,
            url: op.url,
            api_versions: op.api_versions.clone(),
            parameters,
            response_type,
            status_codes: op
                .responses
                .iter()
                .flat_map(|response| response.status_codes.iter().copied())
                .collect(),
            exceptions: op
                .exceptions
                .iter()
                .flat_map(|response| response.status_codes.iter().copied())
                .collect(),
            request_builder: op
                .request_builder
                .map(|builder| self.names.builder_name(client.request_builder(builder).def())),
            initial_operation,
            paging,
            overloads,
            is_overload: op.is_overload,
            is_abstract: op.is_abstract,
            is_lro_initial: op.is_lro_initial,
            internal: op.internal,
            want_tracing: op.want_tracing && self.model.config.tracing,
            json_input_template,
            json_response_template,
        }
    }

    /// Returns a sample JSON value for a body of type `id`. Generated
    /// models document themselves, so there's no sample when models
    /// are generated, or when the body isn't an object or array.
    fn json_template(&self, id: TypeId) -> Option<Value> {
        if self.model.config.models_mode.is_enabled() {
            return None;
        }
        let template = self.model.types.view(id).json_template();
        (template.is_object() || template.is_array()).then_some(template)
    }

    fn operation_imports(&mut self, client: &Client<'a>, op: &Operation<'a>) {
        let model = self.model;
        let config = &model.config;
        self.add_typing("Any");
        for name in [
            "ClientAuthenticationError",
            "HttpResponseError",
            "ResourceExistsError",
            "ResourceNotFoundError",
            "ResourceNotModifiedError",
            "map_error",
        ] {
            self.add_core("exceptions", name);
        }
        self.add_core("pipeline", "PipelineResponse");
        match self.async_mode {
            true => self.add_core("rest", "AsyncHttpResponse"),
            false => self.add_core("rest", "HttpResponse"),
        }
        self.add_core("rest", "HttpRequest");

        if op.kind.paging().is_some() {
            match self.async_mode {
                true => self.add_core("async_paging", "AsyncItemPaged"),
                false => self.add_core("paging", "ItemPaged"),
            }
        }
        if op.kind.lro().is_some() {
            match self.async_mode {
                true => {
                    self.add_core("polling", "AsyncLROPoller");
                    self.add_core("polling", "AsyncNoPolling");
                    self.add_core("polling", "AsyncPollingMethod");
                }
                false => {
                    self.add_core("polling", "LROPoller");
                    self.add_core("polling", "NoPolling");
                    self.add_core("polling", "PollingMethod");
                }
            }
            if config.azure_arm {
                let (module, name) = match self.async_mode {
                    true => ("azure.mgmt.core.polling.async_arm_polling", "AsyncARMPolling"),
                    false => ("azure.mgmt.core.polling.arm_polling", "ARMPolling"),
                };
                self.imports.add_submodule_import(
                    module,
                    name,
                    ImportType::SdkCore,
                    TypingSection::Regular,
                );
            }
        }
        if op.want_tracing && config.tracing {
            match self.async_mode {
                true => self.add_core("tracing.decorator_async", "distributed_trace_async"),
                false => self.add_core("tracing.decorator", "distributed_trace"),
            }
        }
        if op.is_abstract {
            let vendor = format!("{}_vendor", self.client_root());
            self.imports.add_submodule_import(
                &vendor,
                "raise_if_not_implemented",
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        if let Some(index) = op.request_builder
            && config.builders_visibility != BuildersVisibility::Embedded
        {
            let builder = client.request_builder(index).def();
            let module = self.rest_module(builder.group);
            let name = self.names.builder_name(builder);
            self.imports.add_submodule_import(
                &module,
                &name,
                ImportType::Local,
                TypingSection::Regular,
            );
        }
    }

    /// Returns the module that holds the request builders for `group`.
    fn rest_module(&self, group: &str) -> String {
        let rest = self.model.config.rest_layer_name();
        if group.is_empty() {
            format!("{}{rest}", self.root)
        } else {
            format!("{}{rest}.{}", self.root, group.to_snake_case())
        }
    }

    pub(super) fn request_builder(
        &mut self,
        client: &'m Client<'a>,
        builder: &'m RequestBuilder<'a>,
    ) -> RequestBuilderContext<'m> {
        self.add_core("rest", "HttpRequest");
        self.add_core("utils", "case_insensitive_dict");
        self.imports.add_submodule_import(
            &format!("{}_serialization", self.root),
            "Serializer",
            ImportType::Local,
            TypingSection::Regular,
        );
        let mut context = self.request_builder_def(client, builder.def());
        context.overloads = builder
            .overloads()
            .iter()
            .map(|overload| self.request_builder_def(client, overload))
            .collect();
        context
    }

    fn request_builder_def(
        &mut self,
        client: &'m Client<'a>,
        def: &'m RequestBuilderDef<'a>,
    ) -> RequestBuilderContext<'m> {
        let op = client.operation(def.operation);
        RequestBuilderContext {
            name: self.names.builder_name(def),
            method: op.method,
            url: op.url,
            parameters: op
                .parameters
                .iter()
                .map(|parameter| self.parameter(parameter))
                .collect(),
            overloads: vec![],
        }
    }

    fn add_typing(&mut self, name: &str) {
        self.imports.add_submodule_import(
            "typing",
            name,
            ImportType::Stdlib,
            TypingSection::Conditional,
        );
    }

    fn add_core(&mut self, module: &str, name: &str) {
        self.imports
            .add_submodule_import(module, name, ImportType::SdkCore, TypingSection::Regular);
    }
}
