//! Type variants in the code model.

use std::borrow::Cow;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The index of a type in a [`TypeRegistry`](super::TypeRegistry).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A type in the code model.
///
/// Types refer to each other by [`TypeId`], so the graph can contain
/// cycles through models and enums.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeNode<'a> {
    Primitive(PrimitiveType<'a>),
    Constant(ConstantType<'a>),
    Enum(EnumType<'a>),
    EnumValue(EnumValue<'a>),
    List(ListType),
    Dictionary(DictionaryType),
    Model(ModelType<'a>),
    Combined(CombinedType<'a>),
}

impl<'a> TypeNode<'a> {
    /// Returns the name of a named type.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Enum(ty) => Some(&ty.name),
            Self::EnumValue(value) => Some(value.name),
            Self::Model(ty) => Some(ty.name),
            Self::Combined(ty) => ty.name,
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&'a str> {
        match self {
            Self::Primitive(ty) => ty.description,
            Self::Constant(ty) => ty.description,
            Self::Enum(ty) => ty.description,
            Self::EnumValue(value) => value.description,
            Self::Model(ty) => ty.description,
            Self::Combined(ty) => ty.description,
            Self::List(_) | Self::Dictionary(_) => None,
        }
    }

    #[inline]
    pub fn as_model(&self) -> Option<&ModelType<'a>> {
        match self {
            Self::Model(ty) => Some(ty),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&EnumType<'a>> {
        match self {
            Self::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    #[inline]
    pub fn as_combined(&self) -> Option<&CombinedType<'a>> {
        match self {
            Self::Combined(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns the types this type refers to directly.
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            Self::Primitive(_) => vec![],
            Self::Constant(ty) => vec![ty.value_type],
            Self::Enum(ty) => std::iter::once(ty.value_type)
                .chain(ty.values.iter().copied())
                .collect(),
            Self::EnumValue(value) => vec![value.enum_type, value.value_type],
            Self::List(ty) => vec![ty.element],
            Self::Dictionary(ty) => vec![ty.element],
            Self::Model(ty) => ty
                .parents
                .iter()
                .copied()
                .chain(ty.properties.iter().map(|p| p.ty))
                .chain(ty.discriminated_subtypes.values().copied())
                .collect(),
            Self::Combined(ty) => ty.types.clone(),
        }
    }
}

/// A built-in scalar type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PrimitiveType<'a> {
    pub kind: PrimitiveKind,
    pub description: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PrimitiveKind {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    Bytes,
    DateTime(DateTimeFormat),
    UnixTime,
    Date,
    Time,
    Duration,
    /// Any value.
    Any,
    /// Any JSON object.
    AnyObject,
}

/// The wire format of a `datetime`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DateTimeFormat {
    /// RFC 3339 (ISO 8601).
    #[default]
    Rfc3339,
    /// RFC 7231, the HTTP date format.
    Rfc7231,
    /// Seconds since the Unix epoch.
    UnixTimestamp,
}

/// A fixed literal value.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantType<'a> {
    pub value: &'a Value,
    pub value_type: TypeId,
    pub description: Option<&'a str>,
}

/// A set of known literal values.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumType<'a> {
    /// The enum's name, with its first letter capitalized.
    pub name: Cow<'a, str>,
    pub description: Option<&'a str>,
    pub value_type: TypeId,
    /// The [`EnumValue`] types, in declaration order.
    pub values: Vec<TypeId>,
    pub internal: bool,
    pub cross_language_definition_id: Option<&'a str>,
}

/// One known value of an [`EnumType`].
#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue<'a> {
    pub name: &'a str,
    pub value: &'a Value,
    pub description: Option<&'a str>,
    pub enum_type: TypeId,
    pub value_type: TypeId,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListType {
    pub element: TypeId,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

/// A mapping with string keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DictionaryType {
    pub element: TypeId,
}

/// How a model is represented in generated code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBase {
    /// A plain JSON mapping.
    Json,
    /// A dict-backed class.
    Dpg,
    /// A serializer-driven class.
    Msrest,
}

bitflags! {
    /// Where a model is used.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct UsageFlags: u32 {
        const INPUT = 1 << 1;
        const OUTPUT = 1 << 2;
        const API_VERSION_ENUM = 1 << 3;
        const JSON_MERGE_PATCH = 1 << 4;
        const MULTIPART_FORM_DATA = 1 << 5;
        const SPREAD = 1 << 6;
        const ERROR = 1 << 7;
        const JSON = 1 << 8;
        const XML = 1 << 9;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelType<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub base: ModelBase,
    /// Direct parents, in declaration order.
    pub parents: Vec<TypeId>,
    pub properties: Vec<Property<'a>>,
    pub discriminator_value: Option<&'a str>,
    /// Subtypes keyed by their discriminator value.
    pub discriminated_subtypes: IndexMap<&'a str, TypeId>,
    pub usage: UsageFlags,
    pub internal: bool,
    pub cross_language_definition_id: Option<&'a str>,
}

impl ModelType<'_> {
    /// Returns `true` if this model is emitted as a class.
    #[inline]
    pub fn is_public(&self) -> bool {
        !self.internal && self.base != ModelBase::Json
    }

    #[inline]
    pub fn is_polymorphic(&self) -> bool {
        !self.discriminated_subtypes.is_empty()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.usage.contains(UsageFlags::ERROR)
    }

    pub fn discriminator(&self) -> Option<&Property<'_>> {
        self.properties.iter().find(|p| p.is_discriminator)
    }
}

/// A property of a [`ModelType`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property<'a> {
    pub client_name: &'a str,
    pub wire_name: &'a str,
    pub ty: TypeId,
    pub optional: bool,
    pub readonly: bool,
    pub is_discriminator: bool,
    pub description: Option<&'a str>,
    pub flatten: bool,
}

/// A union of types.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedType<'a> {
    /// The union's name, if it's named.
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub types: Vec<TypeId>,
    /// The first member that's a model without discriminated subtypes.
    pub target_model_subtype: Option<TypeId>,
}
