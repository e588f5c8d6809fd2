//! The type registry.

use std::{borrow::Cow, ops::Index};

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::{
    config::{Configuration, ModelsMode},
    parse::{InputError, Node, NodeId},
};

use super::{
    error::NotFoundError,
    types::{
        CombinedType, ConstantType, DateTimeFormat, DictionaryType, EnumType, EnumValue,
        ListType, ModelBase, ModelType, PrimitiveKind, PrimitiveType, Property, TypeId,
        TypeNode, UsageFlags,
    },
    view::TypeView,
};

static NULL: Value = Value::Null;

/// Options that shape how types are built and described.
#[derive(Clone, Copy, Debug)]
pub struct TypeSettings<'a> {
    /// The root namespace of the generated package.
    pub namespace: &'a str,
    pub models_mode: ModelsMode,
    /// The module inside `models` that declares model classes.
    pub models_filename: &'static str,
    /// The module inside `models` that declares enums.
    pub enums_filename: &'static str,
}

impl<'a> TypeSettings<'a> {
    pub fn new(namespace: &'a str, config: &Configuration) -> Self {
        Self {
            namespace,
            models_mode: config.models_mode,
            models_filename: if config.is_legacy() {
                "_models_py3"
            } else {
                "_models"
            },
            enums_filename: "_enums",
        }
    }
}

/// Builds a [`TypeRegistry`] from input nodes.
///
/// Building is re-entrant: a slot for each type is reserved and
/// memoized before its children are built, so a type that refers back
/// to itself, directly or through other types, resolves to the same
/// [`TypeId`] instead of recursing forever.
#[derive(Debug)]
pub struct TypeRegistryBuilder<'a> {
    settings: TypeSettings<'a>,
    slots: Vec<Option<TypeNode<'a>>>,
    ids: FxHashMap<NodeId<'a>, TypeId>,
}

impl<'a> TypeRegistryBuilder<'a> {
    pub fn new(settings: TypeSettings<'a>) -> Self {
        Self {
            settings,
            slots: vec![],
            ids: FxHashMap::default(),
        }
    }

    /// Builds the type for `node`, or returns the existing one if this
    /// node was already built.
    pub fn build_type(&mut self, node: Node<'a>) -> Result<TypeId, InputError> {
        self.memoize(node, |this, id| this.construct(node, id))
    }

    /// Freezes the registry.
    ///
    /// Fails if any type contains itself without passing through a
    /// model or an enum, because such a type can't be written down.
    pub fn finish(self) -> Result<TypeRegistry<'a>, InputError> {
        let mut types: Vec<_> = self
            .slots
            .into_iter()
            .collect::<Option<_>>()
            .ok_or(InputError::Incomplete)?;

        let mut contains = vec![];
        for (index, ty) in types.iter().enumerate() {
            if is_nominal(ty) {
                continue;
            }
            for child in ty.children() {
                if !is_nominal(&types[child.0]) {
                    contains.push((index, child.0));
                }
            }
        }
        if let Some(index) = first_cycle(types.len(), contains) {
            return Err(InputError::UnboundedTypeCycle(label(&types[index])));
        }

        // No model can be its own ancestor.
        let inherits = types
            .iter()
            .enumerate()
            .filter_map(|(index, ty)| Some((index, ty.as_model()?)))
            .flat_map(|(index, model)| model.parents.iter().map(move |parent| (index, parent.0)));
        if let Some(index) = first_cycle(types.len(), inherits) {
            return Err(InputError::InheritanceCycle(label(&types[index])));
        }

        let targets: Vec<_> = types
            .iter()
            .enumerate()
            .filter_map(|(index, ty)| {
                let combined = ty.as_combined()?;
                let target = combined.types.iter().copied().find(|member| {
                    types[member.0]
                        .as_model()
                        .is_some_and(|model| !model.is_polymorphic())
                });
                Some((index, target))
            })
            .collect();
        for (index, target) in targets {
            if let TypeNode::Combined(combined) = &mut types[index] {
                combined.target_model_subtype = target;
            }
        }

        Ok(TypeRegistry {
            settings: self.settings,
            types,
            ids: self.ids,
        })
    }

    fn memoize(
        &mut self,
        node: Node<'a>,
        construct: impl FnOnce(&mut Self, TypeId) -> Result<TypeNode<'a>, InputError>,
    ) -> Result<TypeId, InputError> {
        let key = node.id();
        if let Some(&id) = self.ids.get(&key) {
            trace!(%key, ?id, "reusing type");
            return Ok(id);
        }
        let id = TypeId(self.slots.len());
        self.slots.push(None);
        self.ids.insert(key, id);
        let ty = construct(self, id)?;
        self.slots[id.0] = Some(ty);
        Ok(id)
    }

    fn construct(&mut self, node: Node<'a>, id: TypeId) -> Result<TypeNode<'a>, InputError> {
        let kind = node.required_str("type")?;
        Ok(match kind {
            "model" => TypeNode::Model(self.model(node)?),
            "enum" => TypeNode::Enum(self.enum_(node, id)?),
            "enumvalue" => {
                let enum_type = self.build_type(node.field("enumType")?)?;
                TypeNode::EnumValue(self.enum_value(node, enum_type)?)
            }
            "constant" => TypeNode::Constant(ConstantType {
                value: node.get("value")?.map(Node::value).unwrap_or(&NULL),
                value_type: self.build_type(node.field("valueType")?)?,
                description: node.str("description")?,
            }),
            "list" => TypeNode::List(ListType {
                element: self.build_type(node.field("elementType")?)?,
                min_items: node.u64("minItems")?,
                max_items: node.u64("maxItems")?,
                unique_items: node.flag("uniqueItems")?,
            }),
            "dict" => TypeNode::Dictionary(DictionaryType {
                element: self.build_type(node.field("elementType")?)?,
            }),
            "combined" => TypeNode::Combined(CombinedType {
                name: node.str("name")?,
                description: node.str("description")?,
                types: node
                    .items("types")?
                    .into_iter()
                    .map(|member| self.build_type(member))
                    .collect::<Result<_, _>>()?,
                target_model_subtype: None,
            }),
            other => TypeNode::Primitive(PrimitiveType {
                kind: primitive_kind(other, node)?,
                description: node.str("description")?,
            }),
        })
    }

    fn model(&mut self, node: Node<'a>) -> Result<ModelType<'a>, InputError> {
        let base = match (self.settings.models_mode, node.str("base")?) {
            (ModelsMode::None, _) | (_, Some("json")) => ModelBase::Json,
            (_, Some("dpg")) => ModelBase::Dpg,
            (_, Some("msrest")) => ModelBase::Msrest,
            (_, Some(other)) => {
                return Err(InputError::UnknownKind {
                    field: "model base",
                    value: other.to_owned(),
                });
            }
            (ModelsMode::Dpg, None) => ModelBase::Dpg,
            (ModelsMode::Msrest, None) => ModelBase::Msrest,
        };
        let parents = node
            .items("parents")?
            .into_iter()
            .map(|parent| self.build_type(parent))
            .collect::<Result<_, _>>()?;
        let properties = node
            .items("properties")?
            .into_iter()
            .map(|property| self.property(property))
            .collect::<Result<_, _>>()?;
        let discriminated_subtypes = node
            .entries("discriminatedSubtypes")?
            .into_iter()
            .map(|(value, subtype)| Ok((value, self.build_type(subtype)?)))
            .collect::<Result<_, InputError>>()?;
        Ok(ModelType {
            name: node.required_str("name")?,
            description: node.str("description")?,
            base,
            parents,
            properties,
            discriminator_value: node.str("discriminatorValue")?,
            discriminated_subtypes,
            usage: UsageFlags::from_bits_truncate(
                node.u64("usage")?
                    .and_then(|usage| u32::try_from(usage).ok())
                    .unwrap_or_default(),
            ),
            internal: node.flag("internal")?,
            cross_language_definition_id: node.str("crossLanguageDefinitionId")?,
        })
    }

    fn property(&mut self, node: Node<'a>) -> Result<Property<'a>, InputError> {
        let readonly = node.flag("readonly")?
            || matches!(&*node.strings("visibility")?, ["read"]);
        Ok(Property {
            client_name: node.required_str("clientName")?,
            wire_name: node.required_str("wireName")?,
            ty: self.build_type(node.field("type")?)?,
            optional: node.flag("optional")?,
            readonly,
            is_discriminator: node.flag("isDiscriminator")?,
            description: node.str("description")?,
            flatten: node.flag("flatten")?,
        })
    }

    fn enum_(&mut self, node: Node<'a>, id: TypeId) -> Result<EnumType<'a>, InputError> {
        let value_type = self.build_type(node.field("valueType")?)?;
        let values = node
            .items("values")?
            .into_iter()
            .map(|value| {
                self.memoize(value, |this, _| {
                    Ok(TypeNode::EnumValue(this.enum_value(value, id)?))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(EnumType {
            name: capitalize(node.required_str("name")?),
            description: node.str("description")?,
            value_type,
            values,
            internal: node.flag("internal")?,
            cross_language_definition_id: node.str("crossLanguageDefinitionId")?,
        })
    }

    fn enum_value(&mut self, node: Node<'a>, enum_type: TypeId) -> Result<EnumValue<'a>, InputError> {
        Ok(EnumValue {
            name: node.required_str("name")?,
            value: node.get("value")?.map(Node::value).unwrap_or(&NULL),
            description: node.str("description")?,
            enum_type,
            value_type: self.build_type(node.field("valueType")?)?,
        })
    }
}

/// A frozen, read-only store of every type in the code model.
#[derive(Debug)]
pub struct TypeRegistry<'a> {
    settings: TypeSettings<'a>,
    types: Vec<TypeNode<'a>>,
    ids: FxHashMap<NodeId<'a>, TypeId>,
}

impl<'a> TypeRegistry<'a> {
    #[inline]
    pub fn settings(&self) -> &TypeSettings<'a> {
        &self.settings
    }

    /// Returns the type that was built for `node`.
    pub fn lookup(&self, node: NodeId<'a>) -> Result<TypeId, NotFoundError> {
        self.ids
            .get(&node)
            .copied()
            .ok_or_else(|| NotFoundError::Type(node.to_string()))
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> &TypeNode<'a> {
        &self.types[id.0]
    }

    #[inline]
    pub fn view(&self, id: TypeId) -> TypeView<'_, 'a> {
        TypeView::new(self, id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns all types, in the order they were built.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode<'a>)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, ty)| (TypeId(index), ty))
    }

    pub fn models(&self) -> impl Iterator<Item = (TypeId, &ModelType<'a>)> {
        self.iter()
            .filter_map(|(id, ty)| ty.as_model().map(|model| (id, model)))
    }

    pub fn enums(&self) -> impl Iterator<Item = (TypeId, &EnumType<'a>)> {
        self.iter()
            .filter_map(|(id, ty)| ty.as_enum().map(|ty| (id, ty)))
    }

    /// Returns all unions that have names.
    pub fn named_unions(&self) -> impl Iterator<Item = (TypeId, &CombinedType<'a>)> {
        self.iter().filter_map(|(id, ty)| {
            ty.as_combined()
                .filter(|combined| combined.name.is_some())
                .map(|combined| (id, combined))
        })
    }

    /// Returns the type's name, for types that have one.
    #[inline]
    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.get(id).name()
    }
}

impl<'a> Index<TypeId> for TypeRegistry<'a> {
    type Output = TypeNode<'a>;

    #[inline]
    fn index(&self, id: TypeId) -> &Self::Output {
        self.get(id)
    }
}

/// Returns `true` for types that are emitted by name, and so can
/// refer to themselves.
/// Returns a node on some cycle of the graph with `len` nodes and
/// the given edges, if there is one.
fn first_cycle(len: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Option<usize> {
    let mut graph = DiGraph::<(), ()>::with_capacity(len, 0);
    for _ in 0..len {
        graph.add_node(());
    }
    for (from, to) in edges {
        graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
    }
    tarjan_scc(&graph)
        .into_iter()
        .find(|scc| match scc.as_slice() {
            &[node] => graph.contains_edge(node, node),
            _ => true,
        })
        .map(|scc| scc[0].index())
}

fn is_nominal(ty: &TypeNode<'_>) -> bool {
    matches!(
        ty,
        TypeNode::Model(_) | TypeNode::Enum(_) | TypeNode::EnumValue(_)
    )
}

fn label(ty: &TypeNode<'_>) -> String {
    match (ty.name(), ty) {
        (Some(name), _) => name.to_owned(),
        (None, TypeNode::List(_)) => "anonymous list".to_owned(),
        (None, TypeNode::Dictionary(_)) => "anonymous dictionary".to_owned(),
        (None, TypeNode::Combined(_)) => "anonymous union".to_owned(),
        (None, _) => "anonymous type".to_owned(),
    }
}

fn primitive_kind(kind: &str, node: Node<'_>) -> Result<PrimitiveKind, InputError> {
    Ok(match kind {
        "string" => PrimitiveKind::String,
        "integer" => PrimitiveKind::Integer,
        "float" => PrimitiveKind::Float,
        "decimal" => PrimitiveKind::Decimal,
        "boolean" => PrimitiveKind::Boolean,
        "bytes" => PrimitiveKind::Bytes,
        "datetime" => {
            let format = match node.str("format")?.or(node.str("encode")?) {
                None | Some("rfc3339") => DateTimeFormat::Rfc3339,
                Some("rfc7231") => DateTimeFormat::Rfc7231,
                Some("unixTimestamp" | "unix-timestamp") => DateTimeFormat::UnixTimestamp,
                Some(other) => {
                    return Err(InputError::UnknownKind {
                        field: "datetime format",
                        value: other.to_owned(),
                    });
                }
            };
            PrimitiveKind::DateTime(format)
        }
        "unixtime" => PrimitiveKind::UnixTime,
        "date" => PrimitiveKind::Date,
        "time" => PrimitiveKind::Time,
        "duration" => PrimitiveKind::Duration,
        "any" => PrimitiveKind::Any,
        "any-object" => PrimitiveKind::AnyObject,
        other => {
            return Err(InputError::UnknownKind {
                field: "type",
                value: other.to_owned(),
            });
        }
    })
}

fn capitalize(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            Cow::Owned(first.to_uppercase().chain(chars).collect())
        }
        _ => Cow::Borrowed(name),
    }
}
