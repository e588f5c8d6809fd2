use std::fmt::{self, Debug};

use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value, json};

use super::{
    imports::{FileImport, ImportType, TypingSection},
    registry::TypeRegistry,
    types::{DateTimeFormat, ModelBase, ModelType, PrimitiveKind, TypeId, TypeNode},
};

/// Where a type is being written, which affects how it's spelled
/// and what has to be imported for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeContext<'s> {
    /// Operation files import models at run time, so references to
    /// them don't need quoting.
    pub in_operation_file: bool,
    /// The relative path from the current module to the package root,
    /// like `..`. If `None`, models aren't imported.
    pub root: Option<&'s str>,
    /// Import models only for type checking.
    pub model_typing: bool,
}

/// A read-only view of one type, for asking how it's written.
#[derive(Clone, Copy)]
pub struct TypeView<'r, 'a> {
    registry: &'r TypeRegistry<'a>,
    id: TypeId,
}

impl<'r, 'a> TypeView<'r, 'a> {
    #[inline]
    pub(super) fn new(registry: &'r TypeRegistry<'a>, id: TypeId) -> Self {
        Self { registry, id }
    }

    #[inline]
    pub fn id(self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn node(self) -> &'r TypeNode<'a> {
        self.registry.get(self.id)
    }

    #[inline]
    fn view(self, id: TypeId) -> Self {
        Self::new(self.registry, id)
    }

    fn models_enabled(self) -> bool {
        self.registry.settings().models_mode.is_enabled()
    }

    /// Returns the type's tag for the serializer.
    pub fn serialization_type(self) -> String {
        match self.node() {
            TypeNode::Primitive(ty) => match ty.kind {
                PrimitiveKind::String => "str",
                PrimitiveKind::Integer => "int",
                PrimitiveKind::Float => "float",
                PrimitiveKind::Decimal => "decimal",
                PrimitiveKind::Boolean => "bool",
                PrimitiveKind::Bytes => "bytearray",
                PrimitiveKind::DateTime(DateTimeFormat::Rfc3339) => "iso-8601",
                PrimitiveKind::DateTime(DateTimeFormat::Rfc7231) => "rfc-1123",
                PrimitiveKind::DateTime(DateTimeFormat::UnixTimestamp)
                | PrimitiveKind::UnixTime => "unix-time",
                PrimitiveKind::Date => "date",
                PrimitiveKind::Time => "time",
                PrimitiveKind::Duration => "duration",
                PrimitiveKind::Any => "object",
                PrimitiveKind::AnyObject => "{object}",
            }
            .to_owned(),
            TypeNode::Constant(ty) => self.view(ty.value_type).serialization_type(),
            TypeNode::Enum(ty) => self.view(ty.value_type).serialization_type(),
            TypeNode::EnumValue(value) => self.view(value.value_type).serialization_type(),
            TypeNode::List(ty) => format!("[{}]", self.view(ty.element).serialization_type()),
            TypeNode::Dictionary(ty) => {
                format!("{{{}}}", self.view(ty.element).serialization_type())
            }
            TypeNode::Model(ty) => match ty.base {
                ModelBase::Msrest => ty.name.to_owned(),
                ModelBase::Dpg => format!("_models.{}", ty.name),
                ModelBase::Json => "object".to_owned(),
            },
            TypeNode::Combined(_) => "object".to_owned(),
        }
    }

    /// Returns the type as written in an annotation.
    pub fn type_annotation(self, cx: TypeContext<'_>) -> String {
        let quote = |reference: String| {
            if cx.in_operation_file {
                reference
            } else {
                format!("\"{reference}\"")
            }
        };
        match self.node() {
            TypeNode::Primitive(ty) => match ty.kind {
                PrimitiveKind::String => "str",
                PrimitiveKind::Integer => "int",
                PrimitiveKind::Float => "float",
                PrimitiveKind::Decimal => "decimal.Decimal",
                PrimitiveKind::Boolean => "bool",
                PrimitiveKind::Bytes => "bytes",
                PrimitiveKind::DateTime(_) | PrimitiveKind::UnixTime => "datetime.datetime",
                PrimitiveKind::Date => "datetime.date",
                PrimitiveKind::Time => "datetime.time",
                PrimitiveKind::Duration => "datetime.timedelta",
                PrimitiveKind::Any => "Any",
                PrimitiveKind::AnyObject => "Dict[str, Any]",
            }
            .to_owned(),
            TypeNode::Constant(ty) => format!("Literal[{}]", declaration(ty.value)),
            TypeNode::EnumValue(value) => {
                let name = self.registry.name(value.enum_type).unwrap_or_default();
                format!("Literal[{name}.{}]", value.name)
            }
            TypeNode::Enum(ty) => {
                let value = self.view(ty.value_type).type_annotation(cx);
                if !self.models_enabled() {
                    return value;
                }
                let settings = self.registry.settings();
                let reference = if ty.internal {
                    format!("_models.{}.{}", settings.enums_filename, ty.name)
                } else {
                    format!("_models.{}", ty.name)
                };
                format!("Union[{value}, {}]", quote(reference))
            }
            TypeNode::List(ty) => format!("List[{}]", self.view(ty.element).type_annotation(cx)),
            TypeNode::Dictionary(ty) => {
                format!("Dict[str, {}]", self.view(ty.element).type_annotation(cx))
            }
            TypeNode::Model(ty) if ty.base == ModelBase::Json => "JSON".to_owned(),
            TypeNode::Model(ty) => {
                let settings = self.registry.settings();
                quote(if ty.internal {
                    format!("_models.{}.{}", settings.models_filename, ty.name)
                } else {
                    format!("_models.{}", ty.name)
                })
            }
            TypeNode::Combined(ty) => match ty.name {
                Some(name) => quote(format!("_types.{name}")),
                None => {
                    let members = ty
                        .types
                        .iter()
                        .map(|&member| self.view(member).type_annotation(cx))
                        .unique()
                        .collect_vec();
                    match &*members {
                        [member] => member.clone(),
                        members => format!("Union[{}]", members.join(", ")),
                    }
                }
            },
        }
    }

    /// Returns the type as written in a docstring.
    pub fn docstring_type(self) -> String {
        let namespace = self.registry.settings().namespace;
        match self.node() {
            TypeNode::Primitive(ty) => match ty.kind {
                PrimitiveKind::String => "str",
                PrimitiveKind::Integer => "int",
                PrimitiveKind::Float => "float",
                PrimitiveKind::Decimal => "~decimal.Decimal",
                PrimitiveKind::Boolean => "bool",
                PrimitiveKind::Bytes => "bytes",
                PrimitiveKind::DateTime(_) | PrimitiveKind::UnixTime => "~datetime.datetime",
                PrimitiveKind::Date => "~datetime.date",
                PrimitiveKind::Time => "~datetime.time",
                PrimitiveKind::Duration => "~datetime.timedelta",
                PrimitiveKind::Any => "any",
                PrimitiveKind::AnyObject => "dict[str, any]",
            }
            .to_owned(),
            TypeNode::Constant(ty) => self.view(ty.value_type).docstring_type(),
            TypeNode::EnumValue(value) => self.view(value.value_type).docstring_type(),
            TypeNode::Enum(ty) => {
                let value = self.view(ty.value_type).docstring_type();
                if self.models_enabled() {
                    format!("{value} or ~{namespace}.models.{}", ty.name)
                } else {
                    value
                }
            }
            TypeNode::List(ty) => format!("list[{}]", self.view(ty.element).docstring_type()),
            TypeNode::Dictionary(ty) => {
                format!("dict[str, {}]", self.view(ty.element).docstring_type())
            }
            TypeNode::Model(ty) if ty.base == ModelBase::Json => "JSON".to_owned(),
            TypeNode::Model(ty) => format!("~{namespace}.models.{}", ty.name),
            TypeNode::Combined(ty) => ty
                .types
                .iter()
                .map(|&member| self.view(member).docstring_type())
                .unique()
                .join(" or "),
        }
    }

    /// Returns the type's human-readable description. Enums list
    /// their known values.
    pub fn description(self) -> String {
        match self.node() {
            TypeNode::Enum(ty) => {
                let known = self.known_values();
                match ty.description {
                    Some(description) if !known.is_empty() => format!("{description} {known}"),
                    Some(description) => description.to_owned(),
                    None => known,
                }
            }
            ty => ty.description().unwrap_or_default().to_owned(),
        }
    }

    /// Lists an enum's known values, like
    /// `Known values are: "a", "b", and "c".`
    ///
    /// A single value is returned as-is, and an enum
    /// with no values has no description.
    pub fn known_values(self) -> String {
        let TypeNode::Enum(ty) = self.node() else {
            return String::new();
        };
        let values = ty
            .values
            .iter()
            .filter_map(|&value| match self.registry.get(value) {
                TypeNode::EnumValue(value) => Some(declaration(value.value)),
                _ => None,
            })
            .collect_vec();
        match &*values {
            [] => String::new(),
            [value] => value.clone(),
            [first, second] => format!("Known values are: {first} and {second}."),
            [init @ .., last] => {
                format!("Known values are: {}, and {last}.", init.join(", "))
            }
        }
    }

    /// Returns the imports needed to write this type.
    pub fn imports(self, cx: TypeContext<'_>) -> FileImport {
        let mut imports = FileImport::new();
        self.add_imports(cx, &mut imports);
        imports
    }

    fn add_imports(self, cx: TypeContext<'_>, imports: &mut FileImport) {
        let models_section = if cx.model_typing {
            TypingSection::Typing
        } else {
            TypingSection::Regular
        };
        match self.node() {
            TypeNode::Primitive(ty) => match ty.kind {
                PrimitiveKind::Decimal => {
                    imports.add_import("decimal", ImportType::Stdlib, TypingSection::Regular);
                }
                PrimitiveKind::DateTime(_)
                | PrimitiveKind::UnixTime
                | PrimitiveKind::Date
                | PrimitiveKind::Time
                | PrimitiveKind::Duration => {
                    imports.add_import("datetime", ImportType::Stdlib, TypingSection::Regular);
                }
                PrimitiveKind::Any => {
                    add_typing(imports, "Any");
                }
                PrimitiveKind::AnyObject => {
                    add_typing(imports, "Any");
                    add_typing(imports, "Dict");
                }
                PrimitiveKind::String
                | PrimitiveKind::Integer
                | PrimitiveKind::Float
                | PrimitiveKind::Boolean
                | PrimitiveKind::Bytes => {}
            },
            TypeNode::Constant(ty) => {
                imports.add_submodule_import(
                    "typing",
                    "Literal",
                    ImportType::Stdlib,
                    TypingSection::Regular,
                );
                self.view(ty.value_type).add_imports(cx, imports);
            }
            TypeNode::EnumValue(value) => {
                imports.add_submodule_import(
                    "typing",
                    "Literal",
                    ImportType::Stdlib,
                    TypingSection::Regular,
                );
                if let Some(name) = self.registry.name(value.enum_type) {
                    let settings = self.registry.settings();
                    let module = match cx.root {
                        Some(root) => format!("{root}models.{}", settings.enums_filename),
                        None => format!(".{}", settings.enums_filename),
                    };
                    imports.add_submodule_import(
                        &module,
                        name,
                        ImportType::Local,
                        TypingSection::Regular,
                    );
                }
                self.view(value.value_type).add_imports(cx, imports);
            }
            TypeNode::Enum(ty) => {
                if self.models_enabled() {
                    add_typing(imports, "Union");
                    if let Some(root) = cx.root {
                        imports.add_submodule_import_as(
                            root,
                            "models",
                            "_models",
                            ImportType::Local,
                            models_section,
                        );
                    }
                }
                self.view(ty.value_type).add_imports(cx, imports);
            }
            TypeNode::List(ty) => {
                add_typing(imports, "List");
                self.view(ty.element).add_imports(cx, imports);
            }
            TypeNode::Dictionary(ty) => {
                add_typing(imports, "Dict");
                self.view(ty.element).add_imports(cx, imports);
            }
            TypeNode::Model(ty) if ty.base == ModelBase::Json => {
                add_typing(imports, "Any");
                imports.add_submodule_import(
                    "collections.abc",
                    "MutableMapping",
                    ImportType::Stdlib,
                    TypingSection::Conditional,
                );
                imports.define_mypy_type("JSON", "MutableMapping[str, Any]", None);
            }
            TypeNode::Model(_) => {
                if let Some(root) = cx.root {
                    imports.add_submodule_import_as(
                        root,
                        "models",
                        "_models",
                        ImportType::Local,
                        models_section,
                    );
                }
            }
            TypeNode::Combined(ty) => {
                if ty.name.is_some() {
                    if let Some(root) = cx.root {
                        imports.add_submodule_import(
                            root,
                            "_types",
                            ImportType::Local,
                            TypingSection::Typing,
                        );
                    }
                } else {
                    add_typing(imports, "Union");
                }
                for &member in &ty.types {
                    self.view(member).add_imports(cx, imports);
                }
            }
        }
    }

    /// Returns a sample JSON value with this type's shape,
    /// for docstrings.
    pub fn json_template(self) -> Value {
        self.json_template_inner(&mut FxHashSet::default())
    }

    fn json_template_inner(self, seen: &mut FxHashSet<TypeId>) -> Value {
        match self.node() {
            TypeNode::Primitive(ty) => match ty.kind {
                PrimitiveKind::Integer => json!(0),
                PrimitiveKind::Float | PrimitiveKind::Decimal => json!(0.0),
                PrimitiveKind::Boolean => json!(false),
                PrimitiveKind::Any | PrimitiveKind::AnyObject => json!({}),
                PrimitiveKind::DateTime(_) | PrimitiveKind::UnixTime => {
                    json!("2020-02-20 00:00:00")
                }
                PrimitiveKind::Date => json!("2020-02-20"),
                PrimitiveKind::Time => json!("12:30:00"),
                PrimitiveKind::Duration => json!("1 day, 0:00:00"),
                PrimitiveKind::String | PrimitiveKind::Bytes => {
                    Value::String(self.docstring_type())
                }
            },
            TypeNode::Constant(ty) => ty.value.clone(),
            TypeNode::EnumValue(value) => value.value.clone(),
            TypeNode::Enum(ty) => self.view(ty.value_type).json_template_inner(seen),
            TypeNode::List(ty) => json!([self.view(ty.element).json_template_inner(seen)]),
            TypeNode::Dictionary(ty) => {
                json!({ "str": self.view(ty.element).json_template_inner(seen) })
            }
            TypeNode::Model(model) => {
                // A model that contains itself is written once.
                if !seen.insert(self.id) {
                    return json!({});
                }
                let mut template = Map::new();
                self.add_model_properties(model, &mut template, seen);
                seen.remove(&self.id);
                Value::Object(template)
            }
            TypeNode::Combined(ty) => ty
                .target_model_subtype
                .or_else(|| ty.types.first().copied())
                .map(|member| self.view(member).json_template_inner(seen))
                .unwrap_or(Value::Null),
        }
    }

    fn add_model_properties(
        self,
        model: &ModelType<'a>,
        template: &mut Map<String, Value>,
        seen: &mut FxHashSet<TypeId>,
    ) {
        for &parent in &model.parents {
            if let Some(parent_model) = self.registry.get(parent).as_model() {
                self.view(parent)
                    .add_model_properties(parent_model, template, seen);
            }
        }
        for property in &model.properties {
            let value = self.view(property.ty).json_template_inner(seen);
            template.insert(property.wire_name.to_owned(), value);
        }
    }
}

impl Debug for TypeView<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeView")
            .field("id", &self.id)
            .field("node", self.node())
            .finish()
    }
}

fn add_typing(imports: &mut FileImport, name: &str) {
    imports.add_submodule_import("typing", name, ImportType::Stdlib, TypingSection::Conditional);
}

/// Returns how a literal value is written in source.
pub fn declaration(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Null => "None".to_owned(),
        other => other.to_string(),
    }
}
