//! Clients, operation groups, operations, and request builders.

use std::collections::VecDeque;

use heck::ToSnakeCase;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::{BuildersVisibility, Configuration, Flavor},
    error::GenerateError,
    parse::{InputError, Node, NodeId},
};

use super::{
    error::{NotFoundError, UnsupportedCombinationError},
    registry::{TypeRegistry, TypeRegistryBuilder},
    types::TypeId,
};

/// The index of an operation in its [`Client`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct OperationIndex(usize);

/// The index of a request builder in its [`Client`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RequestBuilderIndex(usize);

/// A client, and everything it owns.
#[derive(Debug)]
pub struct Client<'a> {
    pub id: NodeId<'a>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub url: Option<&'a str>,
    pub parameters: Vec<Parameter<'a>>,
    pub operation_groups: Vec<OperationGroup<'a>>,
    /// Every API version used by any operation, in first-seen order.
    pub api_versions: IndexSet<&'a str>,
    operations: Vec<Operation<'a>>,
    request_builders: Vec<RequestBuilder<'a>>,
    builder_ids: FxHashMap<NodeId<'a>, RequestBuilderIndex>,
}

impl<'a> Client<'a> {
    #[inline]
    pub fn operation(&self, index: OperationIndex) -> &Operation<'a> {
        &self.operations[index.0]
    }

    /// Returns every operation, including overloads.
    #[inline]
    pub fn operations(&self) -> &[Operation<'a>] {
        &self.operations
    }

    #[inline]
    pub fn request_builder(&self, index: RequestBuilderIndex) -> &RequestBuilder<'a> {
        &self.request_builders[index.0]
    }

    #[inline]
    pub fn request_builders(&self) -> &[RequestBuilder<'a>] {
        &self.request_builders
    }

    /// Returns every operation group, breadth-first.
    pub fn groups(&self) -> impl Iterator<Item = &OperationGroup<'a>> {
        let mut queue: VecDeque<_> = self.operation_groups.iter().collect();
        std::iter::from_fn(move || {
            let group = queue.pop_front()?;
            queue.extend(&group.operation_groups);
            Some(group)
        })
    }

    /// Finds an operation by node identity, searching every operation
    /// group breadth-first.
    pub fn lookup_operation(&self, id: NodeId<'a>) -> Option<OperationIndex> {
        self.groups()
            .flat_map(|group| &group.operations)
            .copied()
            .find(|&index| self.operation(index).id == id)
    }

    /// Finds the request builder for the operation with the given
    /// node identity. Overloads resolve to their overloaded builder.
    pub fn lookup_request_builder(&self, id: NodeId<'a>) -> Result<RequestBuilderIndex, NotFoundError> {
        self.builder_ids
            .get(&id)
            .copied()
            .ok_or_else(|| NotFoundError::RequestBuilder(id.to_string()))
    }

    /// Returns the group of operations exposed directly on the client.
    pub fn mixin_group(&self) -> Option<&OperationGroup<'a>> {
        self.operation_groups.iter().find(|group| group.is_mixin())
    }

    #[inline]
    pub fn has_mixin(&self) -> bool {
        self.mixin_group().is_some()
    }

    pub fn has_operations(&self) -> bool {
        self.groups().any(|group| !group.operations.is_empty())
    }

    pub fn has_abstract_operations(&self) -> bool {
        self.operations.iter().any(|op| op.is_abstract)
    }

    pub fn has_lro_operations(&self) -> bool {
        self.operations.iter().any(|op| op.kind.lro().is_some())
    }

    pub fn has_paging_operations(&self) -> bool {
        self.operations.iter().any(|op| op.kind.paging().is_some())
    }

    /// Returns the operations in `group` that get their own request
    /// builder: everything except overloads, abstract operations, and
    /// long-running operations, whose initial operation already has one.
    pub fn builder_operations<'c>(
        &'c self,
        group: &'c OperationGroup<'a>,
    ) -> impl Iterator<Item = &'c Operation<'a>> {
        group
            .operations
            .iter()
            .map(|&index| self.operation(index))
            .filter(|op| op.has_request_builder())
    }

    /// Returns the request builders for `group`, in operation order.
    pub fn group_request_builders<'c>(
        &'c self,
        group: &'c OperationGroup<'a>,
    ) -> impl Iterator<Item = &'c RequestBuilder<'a>> {
        self.builder_operations(group)
            .filter_map(|op| op.request_builder)
            .map(|index| self.request_builder(index))
    }
}

/// A group of operations. The group with an empty identifying name
/// is the client's mixin group.
#[derive(Debug)]
pub struct OperationGroup<'a> {
    pub id: NodeId<'a>,
    pub class_name: &'a str,
    pub identify_name: &'a str,
    pub property_name: &'a str,
    pub operations: Vec<OperationIndex>,
    pub operation_groups: Vec<OperationGroup<'a>>,
    /// The API versions of this group's own operations,
    /// in first-seen order.
    pub api_versions: IndexSet<&'a str>,
}

impl OperationGroup<'_> {
    #[inline]
    pub fn is_mixin(&self) -> bool {
        self.identify_name.is_empty()
    }
}

#[derive(Debug)]
pub struct Operation<'a> {
    pub id: NodeId<'a>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub kind: OperationKind<'a>,
    /// The identifying name of the group that owns this operation.
    pub group: &'a str,
    pub method: &'a str,
    pub url: &'a str,
    pub api_versions: Vec<&'a str>,
    pub parameters: Vec<Parameter<'a>>,
    pub responses: Vec<Response<'a>>,
    pub exceptions: Vec<Response<'a>>,
    /// This operation's overloads. Overloads are operations in their
    /// own right, but aren't listed in any group.
    pub overloads: Vec<OperationIndex>,
    pub is_overload: bool,
    pub is_abstract: bool,
    pub is_lro_initial: bool,
    pub internal: bool,
    pub want_tracing: bool,
    pub cross_language_definition_id: Option<&'a str>,
    pub request_builder: Option<RequestBuilderIndex>,
}

impl Operation<'_> {
    /// Returns `true` if this operation gets its own request builder.
    #[inline]
    pub fn has_request_builder(&self) -> bool {
        !self.is_overload && !self.is_abstract && self.kind.lro().is_none()
    }

    /// Returns the type of the first response that has a body.
    pub fn response_type(&self) -> Option<TypeId> {
        self.responses.iter().find_map(|response| response.ty)
    }
}

#[derive(Debug)]
pub enum OperationKind<'a> {
    Basic,
    Paging(Paging<'a>),
    Lro(Lro),
    LroPaging(Lro, Paging<'a>),
}

impl<'a> OperationKind<'a> {
    #[inline]
    pub fn lro(&self) -> Option<&Lro> {
        match self {
            Self::Lro(lro) | Self::LroPaging(lro, _) => Some(lro),
            _ => None,
        }
    }

    #[inline]
    pub fn paging(&self) -> Option<&Paging<'a>> {
        match self {
            Self::Paging(paging) | Self::LroPaging(_, paging) => Some(paging),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Paging(_) => "paging",
            Self::Lro(_) => "lro",
            Self::LroPaging(..) => "lropaging",
        }
    }
}

#[derive(Debug)]
pub struct Paging<'a> {
    pub item_name: &'a str,
    pub next_link_name: Option<&'a str>,
    pub item_type: Option<TypeId>,
}

/// Long-running operation metadata.
#[derive(Debug)]
pub struct Lro {
    /// The operation that starts this one. Always set once
    /// the client is built.
    pub initial_operation: Option<OperationIndex>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    EndpointPath,
    Other,
}

impl ParameterLocation {
    fn parse(location: Option<&str>) -> Self {
        match location {
            Some("path") => Self::Path,
            Some("query") => Self::Query,
            Some("header") => Self::Header,
            Some("body") => Self::Body,
            Some("endpointPath") => Self::EndpointPath,
            _ => Self::Other,
        }
    }
}

#[derive(Debug)]
pub struct Parameter<'a> {
    pub client_name: &'a str,
    pub wire_name: &'a str,
    pub location: ParameterLocation,
    pub ty: TypeId,
    pub optional: bool,
    pub description: Option<&'a str>,
    /// `true` if the parameter is passed to the method,
    /// `false` if it's stored on the client.
    pub in_method: bool,
    pub is_api_version: bool,
}

#[derive(Debug)]
pub struct Response<'a> {
    pub status_codes: Vec<StatusCode>,
    pub ty: Option<TypeId>,
    pub headers: Vec<ResponseHeader<'a>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
    Code(u16),
    Default,
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Code(code) => serializer.serialize_u16(*code),
            Self::Default => serializer.serialize_str("default"),
        }
    }
}

#[derive(Debug)]
pub struct ResponseHeader<'a> {
    pub wire_name: &'a str,
    pub ty: TypeId,
}

/// A function that builds the HTTP request for one operation.
#[derive(Debug)]
pub enum RequestBuilder<'a> {
    Single(RequestBuilderDef<'a>),
    /// A builder that dispatches to one builder per overload.
    Overloaded {
        builder: RequestBuilderDef<'a>,
        overloads: Vec<RequestBuilderDef<'a>>,
    },
}

impl<'a> RequestBuilder<'a> {
    #[inline]
    pub fn def(&self) -> &RequestBuilderDef<'a> {
        match self {
            Self::Single(builder) | Self::Overloaded { builder, .. } => builder,
        }
    }

    #[inline]
    pub fn overloads(&self) -> &[RequestBuilderDef<'a>] {
        match self {
            Self::Single(_) => &[],
            Self::Overloaded { overloads, .. } => overloads,
        }
    }
}

#[derive(Debug)]
pub struct RequestBuilderDef<'a> {
    pub id: NodeId<'a>,
    pub name: String,
    pub operation: OperationIndex,
    /// The identifying name of the group that owns the operation.
    pub group: &'a str,
}

/// Builds every type that a client refers to, so that building the
/// client itself only needs lookups.
pub(crate) fn discover_types<'a>(
    builder: &mut TypeRegistryBuilder<'a>,
    client: Node<'a>,
) -> Result<(), InputError> {
    fn parameters<'a>(
        builder: &mut TypeRegistryBuilder<'a>,
        node: Node<'a>,
    ) -> Result<(), InputError> {
        for parameter in node.items("parameters")? {
            builder.build_type(parameter.field("type")?)?;
        }
        Ok(())
    }

    fn responses<'a>(
        builder: &mut TypeRegistryBuilder<'a>,
        node: Node<'a>,
        key: &str,
    ) -> Result<(), InputError> {
        for response in node.items(key)? {
            if let Some(ty) = response.get("type")? {
                builder.build_type(ty)?;
            }
            for header in response.items("headers")? {
                builder.build_type(header.field("type")?)?;
            }
        }
        Ok(())
    }

    fn operation<'a>(
        builder: &mut TypeRegistryBuilder<'a>,
        node: Node<'a>,
    ) -> Result<(), InputError> {
        parameters(builder, node)?;
        responses(builder, node, "responses")?;
        responses(builder, node, "exceptions")?;
        if let Some(item_type) = node.get("itemType")? {
            builder.build_type(item_type)?;
        }
        for overload in node.items("overloads")? {
            operation(builder, overload)?;
        }
        Ok(())
    }

    fn group<'a>(builder: &mut TypeRegistryBuilder<'a>, node: Node<'a>) -> Result<(), InputError> {
        for op in node.items("operations")? {
            operation(builder, op)?;
        }
        for child in node.items("operationGroups")? {
            group(builder, child)?;
        }
        Ok(())
    }

    parameters(builder, client)?;
    group(builder, client)
}

/// Builds a [`Client`] from its input node.
pub struct ClientBuilder<'r, 'a> {
    registry: &'r TypeRegistry<'a>,
    config: &'r Configuration,
    operations: Vec<Operation<'a>>,
}

impl<'r, 'a> ClientBuilder<'r, 'a> {
    pub fn new(registry: &'r TypeRegistry<'a>, config: &'r Configuration) -> Self {
        Self {
            registry,
            config,
            operations: vec![],
        }
    }

    pub fn build(mut self, node: Node<'a>) -> Result<Client<'a>, GenerateError> {
        let name = node.required_str("name")?;
        let parameters = self.parameters(node)?;
        let operation_groups = node
            .items("operationGroups")?
            .into_iter()
            .map(|group| self.group(group))
            .collect::<Result<Vec<_>, _>>()?;

        let mut client = Client {
            id: node.id(),
            name,
            description: node.str("description")?,
            url: node.str("url")?,
            parameters,
            operation_groups,
            api_versions: IndexSet::new(),
            operations: self.operations,
            request_builders: vec![],
            builder_ids: FxHashMap::default(),
        };
        client.api_versions = client
            .groups()
            .flat_map(|group| group.api_versions.iter().copied())
            .collect();

        link_lro_operations(&mut client, node)?;
        build_request_builders(&mut client, self.config);
        debug!(
            client = client.name,
            groups = client.groups().count(),
            operations = client.operations.len(),
            request_builders = client.request_builders.len(),
            "built client"
        );
        Ok(client)
    }

    fn group(&mut self, node: Node<'a>) -> Result<OperationGroup<'a>, GenerateError> {
        let identify_name = node.str("identifyName")?.unwrap_or_default();
        let mut operations = vec![];
        let mut api_versions = IndexSet::new();
        for op in node.items("operations")? {
            let index = self.operation(op, identify_name, false)?;
            api_versions.extend(self.operations[index.0].api_versions.iter().copied());
            operations.push(index);
        }
        let operation_groups = node
            .items("operationGroups")?
            .into_iter()
            .map(|child| self.group(child))
            .collect::<Result<_, _>>()?;
        Ok(OperationGroup {
            id: node.id(),
            class_name: node.str("className")?.unwrap_or_default(),
            identify_name,
            property_name: node.str("propertyName")?.unwrap_or_default(),
            operations,
            operation_groups,
            api_versions,
        })
    }

    fn operation(
        &mut self,
        node: Node<'a>,
        group: &'a str,
        is_overload: bool,
    ) -> Result<OperationIndex, GenerateError> {
        let name = node.required_str("name")?;
        let kind = match node.str("discriminator")?.unwrap_or("basic") {
            "basic" | "operation" => OperationKind::Basic,
            "paging" => OperationKind::Paging(self.paging(node)?),
            "lro" => {
                self.check_lro_supported()?;
                OperationKind::Lro(Lro {
                    initial_operation: None,
                })
            }
            "lropaging" => {
                self.check_lro_supported()?;
                OperationKind::LroPaging(
                    Lro {
                        initial_operation: None,
                    },
                    self.paging(node)?,
                )
            }
            other => {
                return Err(InputError::UnknownKind {
                    field: "operation kind",
                    value: other.to_owned(),
                }
                .into());
            }
        };
        let index = OperationIndex(self.operations.len());
        self.operations.push(Operation {
            id: node.id(),
            name,
            description: node.str("description")?,
            kind,
            group,
            method: node.str("method")?.unwrap_or("GET"),
            url: node.str("url")?.unwrap_or_default(),
            api_versions: node.strings("apiVersions")?,
            parameters: self.parameters(node)?,
            responses: self.responses(node, "responses")?,
            exceptions: self.responses(node, "exceptions")?,
            overloads: vec![],
            is_overload,
            is_abstract: node.flag("abstract")?,
            is_lro_initial: node.flag("isLroInitialOperation")?,
            internal: node.flag("internal")?,
            want_tracing: node
                .get("wantTracing")?
                .and_then(|flag| flag.value().as_bool())
                .unwrap_or(true),
            cross_language_definition_id: node.str("crossLanguageDefinitionId")?,
            request_builder: None,
        });
        let overloads = node
            .items("overloads")?
            .into_iter()
            .map(|overload| self.operation(overload, group, true))
            .collect::<Result<_, _>>()?;
        self.operations[index.0].overloads = overloads;
        Ok(index)
    }

    fn check_lro_supported(&self) -> Result<(), UnsupportedCombinationError> {
        match self.config.flavor {
            Flavor::Azure => Ok(()),
            flavor => Err(UnsupportedCombinationError {
                feature: "long-running operations",
                flavor,
            }),
        }
    }

    fn paging(&self, node: Node<'a>) -> Result<Paging<'a>, GenerateError> {
        Ok(Paging {
            item_name: node.str("itemName")?.unwrap_or("value"),
            next_link_name: node.str("nextLinkName")?,
            item_type: node
                .get("itemType")?
                .map(|ty| self.registry.lookup(ty.id()))
                .transpose()?,
        })
    }

    fn parameters(&self, node: Node<'a>) -> Result<Vec<Parameter<'a>>, GenerateError> {
        node.items("parameters")?
            .into_iter()
            .map(|parameter| -> Result<_, GenerateError> {
                Ok(Parameter {
                    client_name: parameter.required_str("clientName")?,
                    wire_name: parameter
                        .str("wireName")?
                        .unwrap_or(parameter.required_str("clientName")?),
                    location: ParameterLocation::parse(parameter.str("location")?),
                    ty: self.registry.lookup(parameter.field("type")?.id())?,
                    optional: parameter.flag("optional")?,
                    description: parameter.str("description")?,
                    in_method: parameter.str("implementation")? != Some("Client"),
                    is_api_version: parameter.flag("isApiVersion")?,
                })
            })
            .collect()
    }

    fn responses(&self, node: Node<'a>, key: &str) -> Result<Vec<Response<'a>>, GenerateError> {
        node.items(key)?
            .into_iter()
            .map(|response| -> Result<_, GenerateError> {
                let status_codes = response
                    .items("statusCodes")?
                    .into_iter()
                    .map(|code| status_code(code.value()))
                    .collect::<Result<_, _>>()?;
                let headers = response
                    .items("headers")?
                    .into_iter()
                    .map(|header| -> Result<_, GenerateError> {
                        Ok(ResponseHeader {
                            wire_name: header.required_str("wireName")?,
                            ty: self.registry.lookup(header.field("type")?.id())?,
                        })
                    })
                    .collect::<Result<_, GenerateError>>()?;
                Ok(Response {
                    status_codes,
                    ty: response
                        .get("type")?
                        .map(|ty| self.registry.lookup(ty.id()))
                        .transpose()?,
                    headers,
                })
            })
            .collect()
    }
}

fn status_code(value: &Value) -> Result<StatusCode, InputError> {
    let code = match value {
        Value::String(s) if s == "default" => return Ok(StatusCode::Default),
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    };
    code.map(StatusCode::Code)
        .ok_or_else(|| InputError::UnknownKind {
            field: "status code",
            value: value.to_string(),
        })
}

/// Points every long-running operation at its initial operation,
/// which can live in any group of the client.
fn link_lro_operations<'a>(client: &mut Client<'a>, node: Node<'a>) -> Result<(), GenerateError> {
    let mut initial_nodes = FxHashMap::default();
    collect_initial_nodes(node, &mut initial_nodes)?;

    let mut links = vec![];
    for (index, op) in client.operations.iter().enumerate() {
        if op.kind.lro().is_none() {
            continue;
        }
        let initial = initial_nodes
            .get(&op.id)
            .and_then(|&initial| client.lookup_operation(initial))
            .ok_or_else(|| NotFoundError::InitialOperation {
                client: client.name.to_owned(),
                operation: op.name.to_owned(),
            })?;
        links.push((index, initial));
    }
    for (index, initial) in links {
        if let OperationKind::Lro(lro) | OperationKind::LroPaging(lro, _) =
            &mut client.operations[index].kind
        {
            lro.initial_operation = Some(initial);
        }
    }
    Ok(())
}

/// Maps each long-running operation's node to the node of
/// its initial operation.
fn collect_initial_nodes<'a>(
    node: Node<'a>,
    initial_nodes: &mut FxHashMap<NodeId<'a>, NodeId<'a>>,
) -> Result<(), InputError> {
    for group in node.items("operationGroups")? {
        for op in group.items("operations")? {
            if let Some(initial) = op.get("initialOperation")? {
                initial_nodes.insert(op.id(), initial.id());
            }
        }
        collect_initial_nodes(group, initial_nodes)?;
    }
    Ok(())
}

fn build_request_builders<'a>(client: &mut Client<'a>, config: &Configuration) {
    let prefix_with_group = config.combine_operation_files
        && config.builders_visibility == BuildersVisibility::Embedded;
    let name = |op: &Operation<'_>| {
        let op_name = op.name.trim_start_matches('_').to_snake_case();
        if prefix_with_group && !op.group.is_empty() {
            format!("build_{}_{op_name}_request", op.group.to_snake_case())
        } else {
            format!("build_{op_name}_request")
        }
    };
    let def = |index: OperationIndex, op: &Operation<'a>| RequestBuilderDef {
        id: op.id,
        name: name(op),
        operation: index,
        group: op.group,
    };

    let indices: Vec<_> = client
        .groups()
        .flat_map(|group| group.operations.iter().copied())
        .filter(|&index| client.operation(index).has_request_builder())
        .collect();
    let mut builders = Vec::with_capacity(indices.len());
    let mut builder_ids = FxHashMap::default();
    for &index in &indices {
        let op = client.operation(index);
        let builder_index = RequestBuilderIndex(builders.len());
        builder_ids.insert(op.id, builder_index);
        let builder = if op.overloads.is_empty() {
            RequestBuilder::Single(def(index, op))
        } else {
            let overloads = op
                .overloads
                .iter()
                .map(|&overload| {
                    let overload_op = client.operation(overload);
                    builder_ids.insert(overload_op.id, builder_index);
                    def(overload, overload_op)
                })
                .collect();
            RequestBuilder::Overloaded {
                builder: def(index, op),
                overloads,
            }
        };
        builders.push(builder);
    }

    for (builder_index, &index) in indices.iter().enumerate() {
        client.operations[index.0].request_builder = Some(RequestBuilderIndex(builder_index));
    }
    // Long-running operations build their requests with
    // their initial operation's builder.
    let lro_builders: Vec<_> = client
        .operations
        .iter()
        .enumerate()
        .filter_map(|(index, op)| {
            let initial = op.kind.lro()?.initial_operation?;
            let builder = client.operation(initial).request_builder?;
            Some((index, builder))
        })
        .collect();
    for (index, builder) in lro_builders {
        client.operations[index].request_builder = Some(builder);
    }

    client.request_builders = builders;
    client.builder_ids = builder_ids;
}
