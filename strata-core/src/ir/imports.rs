//! Relative namespaces and per-file import accumulation.

use std::collections::BTreeMap;

use compact_str::{CompactString, ToCompactString};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

/// Computes the relative import path from `from` to `to`, where both
/// are dotted package namespaces.
///
/// The result always starts with at least one `.`: a single `.` is the
/// package `from` itself, and each additional `.` steps up one level.
/// Whatever's left of `to` after the common prefix is appended.
///
/// ```
/// # use strata_core::ir::relative_path;
/// assert_eq!(relative_path("pkg.sub.ops", "pkg.sub"), "..");
/// assert_eq!(relative_path("pkg.sub.ops", "pkg.other"), "...other");
/// assert_eq!(relative_path("pkg", "pkg"), ".");
/// assert_eq!(relative_path("pkg", "pkg.sub"), ".sub");
/// ```
pub fn relative_path(from: &str, to: &str) -> String {
    let from = segments(from);
    let to = segments(to);
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut path = ".".repeat(from.len() - common + 1);
    path.push_str(&to[common..].iter().join("."));
    path
}

/// Returns the relative path from `from` to `module` inside the
/// package `to`, like `.._vendor` or `._client`.
pub fn relative_module(from: &str, to: &str, module: &str) -> String {
    let mut path = relative_path(from, to);
    if !path.ends_with('.') {
        path.push('.');
    }
    path.push_str(module);
    path
}

fn segments(namespace: &str) -> Vec<&str> {
    namespace.split('.').filter(|s| !s.is_empty()).collect()
}

/// Where an imported module comes from. Imports are grouped by origin,
/// in this order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportType {
    Stdlib,
    ThirdParty,
    /// The runtime library that generated code is built on. The module
    /// is relative to the library root, which depends on the flavor.
    SdkCore,
    Local,
}

/// When an import is needed. Stronger needs win when imports merge.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypingSection {
    /// Only for type annotations, under `if TYPE_CHECKING:`.
    Typing,
    /// For annotations on older interpreters; at run time on newer ones.
    Conditional,
    /// At run time.
    Regular,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ImportKey {
    pub import_type: ImportType,
    pub module: CompactString,
    /// The imported name, for `from module import name`.
    pub submodule: Option<CompactString>,
    pub alias: Option<CompactString>,
}

/// A type alias that an artifact has to declare.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TypeDefinition {
    pub sync: CompactString,
    pub r#async: CompactString,
}

/// Accumulates the imports that one artifact needs.
///
/// Adding the same import twice keeps one entry. If the same import is
/// needed in two sections, the stronger section wins. If two different
/// definitions share an alias name, the lesser one wins. Either way,
/// merging is commutative and idempotent.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileImport {
    imports: IndexMap<ImportKey, TypingSection>,
    type_definitions: IndexMap<CompactString, TypeDefinition>,
}

impl FileImport {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `import module`.
    pub fn add_import(&mut self, module: &str, import_type: ImportType, section: TypingSection) {
        self.append(
            ImportKey {
                import_type,
                module: module.to_compact_string(),
                submodule: None,
                alias: None,
            },
            section,
        );
    }

    /// Adds `from module import name`.
    pub fn add_submodule_import(
        &mut self,
        module: &str,
        name: &str,
        import_type: ImportType,
        section: TypingSection,
    ) {
        self.append(
            ImportKey {
                import_type,
                module: module.to_compact_string(),
                submodule: Some(name.to_compact_string()),
                alias: None,
            },
            section,
        );
    }

    /// Adds `from module import name as alias`.
    pub fn add_submodule_import_as(
        &mut self,
        module: &str,
        name: &str,
        alias: &str,
        import_type: ImportType,
        section: TypingSection,
    ) {
        self.append(
            ImportKey {
                import_type,
                module: module.to_compact_string(),
                submodule: Some(name.to_compact_string()),
                alias: Some(alias.to_compact_string()),
            },
            section,
        );
    }

    /// Declares a type alias for type checkers, like `JSON`.
    pub fn define_mypy_type(&mut self, name: &str, sync: &str, r#async: Option<&str>) {
        self.define(
            name.to_compact_string(),
            TypeDefinition {
                sync: sync.to_compact_string(),
                r#async: r#async.unwrap_or(sync).to_compact_string(),
            },
        );
    }

    /// Merges all of `other`'s imports into this one.
    pub fn merge(&mut self, other: &FileImport) {
        for (key, &section) in &other.imports {
            self.append(key.clone(), section);
        }
        for (name, definition) in &other.type_definitions {
            self.define(name.clone(), definition.clone());
        }
    }

    /// Returns the section of an import, if it was added.
    pub fn section(&self, module: &str, name: Option<&str>) -> Option<TypingSection> {
        self.imports
            .iter()
            .find(|(key, _)| key.module == module && key.submodule.as_deref() == name)
            .map(|(_, &section)| section)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&ImportKey, TypingSection)> {
        self.imports.iter().map(|(key, &section)| (key, section))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.type_definitions.is_empty()
    }

    /// Groups the imports into statements for rendering. Modules from
    /// the runtime library are qualified with `core_library`.
    pub fn to_import_list(&self, core_library: &str) -> ImportList {
        let mut runtime = BTreeMap::<_, Vec<_>>::new();
        let mut type_checking = BTreeMap::<_, Vec<_>>::new();
        for (key, section) in self.iter() {
            let module = match key.import_type {
                ImportType::SdkCore if key.module.is_empty() => core_library.to_owned(),
                ImportType::SdkCore if !key.module.starts_with("azure") => {
                    format!("{core_library}.{}", key.module)
                }
                _ => key.module.to_string(),
            };
            let statements = match section {
                TypingSection::Typing => &mut type_checking,
                TypingSection::Conditional | TypingSection::Regular => &mut runtime,
            };
            let name = key.submodule.as_ref().map(|name| ImportedName {
                name: name.to_string(),
                alias: key.alias.as_ref().map(|a| a.to_string()),
            });
            statements
                .entry((key.import_type, module, name.is_none()))
                .or_default()
                .extend(name);
        }
        let statements = |map: BTreeMap<(ImportType, String, bool), Vec<ImportedName>>| {
            map.into_iter()
                .map(|((import_type, module, _), mut names)| {
                    names.sort();
                    names.dedup();
                    ImportStatement {
                        import_type,
                        module,
                        names,
                    }
                })
                .collect_vec()
        };
        ImportList {
            runtime: statements(runtime),
            type_checking: statements(type_checking),
            type_definitions: self
                .type_definitions
                .iter()
                .map(|(name, definition)| (name.to_string(), definition.clone()))
                .collect(),
        }
    }
}

/// Rendered import statements for one artifact.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ImportList {
    /// Imports needed at run time.
    pub runtime: Vec<ImportStatement>,
    /// Imports only needed for type checking.
    pub type_checking: Vec<ImportStatement>,
    pub type_definitions: IndexMap<String, TypeDefinition>,
}

/// One import statement: `import module` when `names` is empty,
/// otherwise `from module import names`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ImportStatement {
    pub import_type: ImportType,
    pub module: String,
    pub names: Vec<ImportedName>,
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ImportedName {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl FileImport {
    fn append(&mut self, key: ImportKey, section: TypingSection) {
        self.imports
            .entry(key)
            .and_modify(|existing| *existing = (*existing).max(section))
            .or_insert(section);
    }

    fn define(&mut self, name: CompactString, definition: TypeDefinition) {
        self.type_definitions
            .entry(name)
            .and_modify(|existing| {
                if definition < *existing {
                    *existing = definition.clone();
                }
            })
            .or_insert(definition);
    }
}
