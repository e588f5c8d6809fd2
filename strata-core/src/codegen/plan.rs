//! Decides which artifacts a code model produces, where each one goes,
//! and what goes into its render context.

use std::rc::Rc;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    config::{BuildersVisibility, ModelsMode},
    ir::{
        Client, CodeModel, FileImport, ImportType, ModelBase, NotFoundError, OperationGroup,
        TypingSection, relative_module, relative_path,
    },
    parse::NodeId,
};

use super::{
    context::{ArtifactBody, ContextBuilder, GroupExport, RenderContext},
    names::{EmittedNames, emitted_groups},
    unique::UniqueNames,
};

/// The name of the file that maps generated names to
/// cross-language definition IDs.
pub const CROSS_LANGUAGE_DEFINITIONS_FILE: &str = "apiview-properties.json";

/// One output file's worth of generated content.
#[derive(Debug, Serialize)]
pub struct Artifact<'m> {
    /// The path of the file, relative to the output directory,
    /// with `/` separators. Paths are unique within a plan.
    pub path: String,
    /// If set, a file that already exists at this path is kept
    /// instead of being overwritten.
    pub preserve_existing: bool,
    pub context: RenderContext<'m>,
}

/// Plans every artifact for a code model.
///
/// Planning only reads the code model. Either every artifact is
/// planned, or none are.
pub fn plan_artifacts<'m>(model: &'m CodeModel<'_>) -> Result<Vec<Artifact<'m>>, NotFoundError> {
    let mut planner = Planner::new(model);
    planner.root_package(false);
    if model.has_models() {
        planner.models();
    }
    if model.has_operations() {
        if model.config.builders_visibility != BuildersVisibility::Embedded {
            planner.request_builders()?;
        }
        if model.config.show_operations {
            planner.operations(false)?;
        }
    }
    if !model.config.no_async {
        planner.root_package(true);
        if model.has_operations() && model.config.show_operations {
            planner.operations(true)?;
        }
    }
    if model.config.emit_cross_language_definition_file {
        planner.cross_language_definitions();
    }
    debug!(artifacts = planner.artifacts.len(), "planned artifacts");
    Ok(planner.artifacts)
}

struct Planner<'m, 'a> {
    model: &'m CodeModel<'a>,
    names: Rc<EmittedNames<'a>>,
    /// The folder of the root package, like `contoso/widgets`.
    folder: String,
    /// The module of each client, in client order.
    client_modules: Vec<String>,
    artifacts: Vec<Artifact<'m>>,
}

impl<'m, 'a> Planner<'m, 'a> {
    fn new(model: &'m CodeModel<'a>) -> Self {
        let folder = if model.config.no_namespace_folders {
            String::new()
        } else {
            model.namespace.replace('.', "/")
        };
        let mut names = UniqueNames::with_reserved([
            "_configuration",
            "_model_base",
            "_patch",
            "_serialization",
            "_types",
            "_validation",
            "_vendor",
            "_version",
        ]);
        let client_modules = match &*model.clients {
            [_] => vec!["_client".to_owned()],
            clients => clients
                .iter()
                .map(|client| {
                    let module = format!("_{}", client.name.to_snake_case());
                    names.uniquify(&module).into_owned()
                })
                .collect(),
        };
        Self {
            model,
            names: Rc::new(EmittedNames::new(model)),
            folder,
            client_modules,
            artifacts: vec![],
        }
    }

    /// Returns the dotted package name for a subpackage.
    fn package(&self, sub: &[&str]) -> String {
        std::iter::once(self.model.namespace)
            .chain(sub.iter().copied())
            .join(".")
    }

    fn builder(&self, sub: &[&str], async_mode: bool) -> ContextBuilder<'m, 'a> {
        let root = relative_path(&self.package(sub), self.model.namespace);
        ContextBuilder::new(self.model, Rc::clone(&self.names), root, async_mode)
    }

    fn push(
        &mut self,
        sub: &[&str],
        file: &str,
        builder: ContextBuilder<'m, 'a>,
        body: ArtifactBody<'m>,
    ) {
        let package = self.package(sub);
        let module = match file.strip_suffix(".py") {
            Some("__init__") | None => package,
            Some(stem) => format!("{package}.{stem}"),
        };
        let path = std::iter::once(self.folder.as_str())
            .chain(sub.iter().copied())
            .chain(std::iter::once(file))
            .filter(|segment| !segment.is_empty())
            .join("/");
        self.push_path(path, module, builder, body);
    }

    /// Plans an artifact at a path relative to the output directory.
    fn push_path(
        &mut self,
        path: String,
        module: String,
        builder: ContextBuilder<'m, 'a>,
        body: ArtifactBody<'m>,
    ) {
        let preserve_existing = match &body {
            ArtifactBody::Patch => true,
            ArtifactBody::Version { .. } => self.model.config.keep_version_file,
            _ => false,
        };
        debug!(path, kind = body.kind(), "planned artifact");
        self.artifacts.push(Artifact {
            path,
            preserve_existing,
            context: builder.finish(module, body),
        });
    }

    fn patch(&mut self, sub: &[&str], async_mode: bool) {
        let builder = self.builder(sub, async_mode);
        self.push(sub, "_patch.py", builder, ArtifactBody::Patch);
    }

    /// Plans the files directly in the root package, or in `aio`.
    fn root_package(&mut self, async_mode: bool) {
        let model = self.model;
        let config = &model.config;
        let sub: &[&str] = if async_mode { &["aio"] } else { &[] };

        // `__init__`.
        let mut builder = self.builder(sub, async_mode);
        let imports = builder.imports();
        for (client, module) in model.clients.iter().zip(&self.client_modules) {
            imports.add_submodule_import(
                &format!(".{module}"),
                client.name,
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        if !async_mode {
            imports.add_submodule_import(
                "._version",
                "VERSION",
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        add_patch_imports(imports);
        self.push(
            sub,
            "__init__.py",
            builder,
            ArtifactBody::PackageInit {
                clients: model.clients.iter().map(|client| client.name).collect(),
                has_version: !async_mode,
            },
        );

        if !async_mode {
            let builder = self.builder(sub, async_mode);
            let version = config.package_version.as_deref().unwrap_or("1.0.0b1");
            self.push(sub, "_version.py", builder, ArtifactBody::Version { version });
        }

        // `_configuration`.
        let mut builder = self.builder(sub, async_mode);
        let clients = model
            .clients
            .iter()
            .map(|client| builder.client(client))
            .collect();
        let version = relative_module(&self.package(sub), model.namespace, "_version");
        let imports = builder.imports();
        imports.add_submodule_import("pipeline", "policies", ImportType::SdkCore, TypingSection::Regular);
        imports.add_submodule_import(&version, "VERSION", ImportType::Local, TypingSection::Regular);
        self.push(
            sub,
            "_configuration.py",
            builder,
            ArtifactBody::Configuration { clients },
        );

        // One file per client.
        for (client, module) in model.clients.iter().zip(self.client_modules.clone()) {
            let mut builder = self.builder(sub, async_mode);
            let context = builder.client(client);
            self.client_imports(&mut builder, client, async_mode);
            self.push(
                sub,
                &format!("{module}.py"),
                builder,
                ArtifactBody::Client { client: context },
            );
        }

        let unions = model.named_unions();
        if !async_mode && !unions.is_empty() {
            let mut builder = self.builder(sub, async_mode);
            let unions = unions
                .into_iter()
                .filter_map(|id| builder.union(id))
                .collect();
            self.push(sub, "_types.py", builder, ArtifactBody::Types { unions });
        }

        if !async_mode {
            let builder = self.builder(sub, async_mode);
            self.push(sub, "_serialization.py", builder, ArtifactBody::Serialization);
            if config.models_mode == ModelsMode::Dpg && model.has_models() {
                let builder = self.builder(sub, async_mode);
                self.push(sub, "_model_base.py", builder, ArtifactBody::ModelBase);
            }
            if config.client_side_validation {
                let builder = self.builder(sub, async_mode);
                self.push(sub, "_validation.py", builder, ArtifactBody::Validation);
            }
        }

        if model.need_vendored_code() {
            let mut builder = self.builder(sub, async_mode);
            let mixin_clients = match model.need_mixin_abc() {
                true => model
                    .clients
                    .iter()
                    .filter(|client| client.has_mixin())
                    .map(|client| client.name)
                    .collect_vec(),
                false => vec![],
            };
            if !mixin_clients.is_empty() {
                let pipeline_client = match async_mode {
                    true => "AsyncPipelineClient",
                    false => "PipelineClient",
                };
                let imports = builder.imports();
                imports.add_submodule_import("abc", "ABC", ImportType::Stdlib, TypingSection::Regular);
                imports.add_submodule_import(
                    "",
                    pipeline_client,
                    ImportType::SdkCore,
                    TypingSection::Typing,
                );
                for client in model.clients.iter().filter(|client| client.has_mixin()) {
                    imports.add_submodule_import(
                        "._configuration",
                        &format!("{}Configuration", client.name),
                        ImportType::Local,
                        TypingSection::Typing,
                    );
                }
            }
            self.push(
                sub,
                "_vendor.py",
                builder,
                ArtifactBody::Vendor {
                    mixin_clients,
                    has_abstract_operations: model.has_abstract_operations(),
                },
            );
        }

        self.patch(sub, async_mode);

        if !async_mode {
            let builder = self.builder(sub, async_mode);
            self.push(sub, "py.typed", builder, ArtifactBody::PyTyped);
        }
    }

    fn client_imports(
        &self,
        builder: &mut ContextBuilder<'m, 'a>,
        client: &Client<'a>,
        async_mode: bool,
    ) {
        let model = self.model;
        let config = &model.config;
        let root = builder.root().to_owned();
        let imports = builder.imports();

        let (pipeline_client, response) = match async_mode {
            true => ("AsyncPipelineClient", "AsyncHttpResponse"),
            false => ("PipelineClient", "HttpResponse"),
        };
        imports.add_submodule_import("", pipeline_client, ImportType::SdkCore, TypingSection::Regular);
        imports.add_submodule_import("pipeline", "policies", ImportType::SdkCore, TypingSection::Regular);
        imports.add_submodule_import("rest", "HttpRequest", ImportType::SdkCore, TypingSection::Regular);
        imports.add_submodule_import("rest", response, ImportType::SdkCore, TypingSection::Regular);
        imports.add_submodule_import("copy", "deepcopy", ImportType::Stdlib, TypingSection::Regular);
        if async_mode {
            imports.add_submodule_import(
                "typing",
                "Awaitable",
                ImportType::Stdlib,
                TypingSection::Conditional,
            );
        }
        imports.add_submodule_import(
            "._configuration",
            &format!("{}Configuration", client.name),
            ImportType::Local,
            TypingSection::Regular,
        );
        let serialization = format!("{root}_serialization");
        for name in ["Deserializer", "Serializer"] {
            imports.add_submodule_import(&serialization, name, ImportType::Local, TypingSection::Regular);
        }
        if model.has_models() && config.models_mode.is_enabled() {
            imports.add_submodule_import_as(
                &root,
                "models",
                "_models",
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        if config.show_operations {
            let operations = format!(".{}", model.operations_folder_name());
            for group in &client.operation_groups {
                imports.add_submodule_import(
                    &operations,
                    &self.names.class_name(client, group),
                    ImportType::Local,
                    TypingSection::Regular,
                );
            }
        }
    }

    /// Plans the `models` package.
    fn models(&mut self) {
        let model = self.model;
        let settings = model.types.settings();
        let sub: &[&str] = &["models"];
        let models = model.public_model_types().collect_vec();
        let enums = model.enums();

        let mut builder = self.builder(sub, false);
        let imports = builder.imports();
        let models_module = format!(".{}", settings.models_filename);
        for &id in &models {
            if let Some(name) = model.types.name(id) {
                imports.add_submodule_import(&models_module, name, ImportType::Local, TypingSection::Regular);
            }
        }
        let enums_module = format!(".{}", settings.enums_filename);
        for &id in &enums {
            if let Some(name) = model.types.name(id) {
                imports.add_submodule_import(&enums_module, name, ImportType::Local, TypingSection::Regular);
            }
        }
        add_patch_imports(imports);
        self.push(
            sub,
            "__init__.py",
            builder,
            ArtifactBody::ModelsInit {
                models: models.iter().filter_map(|&id| model.types.name(id)).collect(),
                enums: enums.iter().filter_map(|&id| model.types.name(id)).collect(),
            },
        );

        if !models.is_empty() {
            let mut builder = self.builder(sub, false);
            let contexts = models
                .iter()
                .filter_map(|&id| builder.model(id))
                .collect_vec();
            let root = builder.root().to_owned();
            let imports = builder.imports();
            let bases = contexts.iter().map(|context| context.base).unique();
            for base in bases {
                match base {
                    ModelBase::Msrest => imports.add_submodule_import(
                        &root,
                        "_serialization",
                        ImportType::Local,
                        TypingSection::Regular,
                    ),
                    ModelBase::Dpg => {
                        let module = format!("{root}_model_base");
                        for name in ["Model", "rest_discriminator", "rest_field"] {
                            imports.add_submodule_import(&module, name, ImportType::Local, TypingSection::Regular);
                        }
                    }
                    ModelBase::Json => {}
                }
            }
            self.push(
                sub,
                &format!("{}.py", settings.models_filename),
                builder,
                ArtifactBody::Models { models: contexts },
            );
        }

        if !enums.is_empty() {
            let mut builder = self.builder(sub, false);
            let contexts = enums
                .iter()
                .filter_map(|&id| builder.enum_(id))
                .collect_vec();
            let imports = builder.imports();
            imports.add_submodule_import("enum", "Enum", ImportType::Stdlib, TypingSection::Regular);
            imports.add_submodule_import(
                "",
                "CaseInsensitiveEnumMeta",
                ImportType::SdkCore,
                TypingSection::Regular,
            );
            self.push(
                sub,
                &format!("{}.py", settings.enums_filename),
                builder,
                ArtifactBody::Enums { enums: contexts },
            );
        }

        self.patch(sub, false);
    }

    /// Plans the operations package, or its `aio` mirror.
    fn operations(&mut self, async_mode: bool) -> Result<(), NotFoundError> {
        let model = self.model;
        let config = &model.config;
        let folder = model.operations_folder_name();
        let sub: &[&str] = if async_mode { &["aio", folder] } else { &[folder] };
        let embedded = config.builders_visibility == BuildersVisibility::Embedded;

        // Every group class, and the module that defines it.
        let mut groups = vec![];
        let mut file_names = UniqueNames::with_reserved(["__init__", "_patch"]);
        for client in &model.clients {
            for group in emitted_groups(client) {
                let class_name = self.names.class_name(client, group);
                let module = match config.combine_operation_files {
                    true => "_operations".to_owned(),
                    false => file_names
                        .uniquify(&format!("_{}", class_name.to_snake_case()))
                        .into_owned(),
                };
                groups.push((client, group, class_name, module));
            }
        }
        let modules: FxHashMap<NodeId<'a>, (String, String)> = groups
            .iter()
            .map(|(_, group, class_name, module)| (group.id, (class_name.clone(), module.clone())))
            .collect();
        let exports = groups
            .iter()
            .map(|(_, _, class_name, module)| GroupExport {
                class_name: class_name.clone(),
                module: format!(".{module}"),
            })
            .collect_vec();

        // Files, and the groups in each, in first-seen order.
        let mut files = IndexMap::<&str, Vec<_>>::new();
        for (client, group, _, module) in &groups {
            files.entry(module.as_str()).or_default().push((*client, *group));
        }
        for (module, file_groups) in files {
            let mut builder = self.builder(sub, async_mode).in_operation_file();
            let mut contexts = vec![];
            let mut request_builders = vec![];
            for (client, group) in file_groups {
                contexts.push(builder.group(client, group));
                add_child_group_imports(builder.imports(), &modules, module, group);
                if embedded {
                    for op in client.builder_operations(group) {
                        let index = client.lookup_request_builder(op.id)?;
                        request_builders
                            .push(builder.request_builder(client, client.request_builder(index)));
                    }
                }
            }
            self.push(
                sub,
                &format!("{module}.py"),
                builder,
                ArtifactBody::Operations {
                    groups: contexts,
                    request_builders,
                },
            );
        }

        let mut builder = self.builder(sub, async_mode);
        let imports = builder.imports();
        for export in &exports {
            imports.add_submodule_import(
                &export.module,
                &export.class_name,
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        add_patch_imports(imports);
        self.push(
            sub,
            "__init__.py",
            builder,
            ArtifactBody::OperationsInit { groups: exports },
        );
        self.patch(sub, async_mode);
        Ok(())
    }

    /// Plans the public or hidden request-builder layer. Builders for
    /// groups with the same name across clients share a module.
    fn request_builders(&mut self) -> Result<(), NotFoundError> {
        let model = self.model;
        let rest = model.config.rest_layer_name();

        let mut modules = IndexMap::<String, Vec<_>>::new();
        for client in &model.clients {
            for group in client.groups() {
                let module = group.identify_name.to_snake_case();
                let builders = modules.entry(module).or_default();
                for op in client.builder_operations(group) {
                    let index = client.lookup_request_builder(op.id)?;
                    builders.push((client, client.request_builder(index)));
                }
            }
        }

        let mut top_level = vec![];
        let mut submodules = vec![];
        for (module, builders) in modules {
            let sub: Vec<&str> = if module.is_empty() {
                vec![rest]
            } else {
                vec![rest, &module]
            };
            let mut builder = self.builder(&sub, false);
            let contexts = builders
                .iter()
                .map(|&(client, request_builder)| builder.request_builder(client, request_builder))
                .collect_vec();
            let names = builders
                .iter()
                .map(|&(_, request_builder)| self.names.builder_name(request_builder.def()))
                .collect_vec();
            self.push(
                &sub,
                "_request_builders.py",
                builder,
                ArtifactBody::RequestBuilders {
                    request_builders: contexts,
                },
            );
            if module.is_empty() {
                top_level = names;
            } else {
                let mut builder = self.builder(&sub, false);
                let imports = builder.imports();
                for name in &names {
                    imports.add_submodule_import(
                        "._request_builders",
                        name,
                        ImportType::Local,
                        TypingSection::Regular,
                    );
                }
                self.push(
                    &sub,
                    "__init__.py",
                    builder,
                    ArtifactBody::RequestBuildersInit {
                        request_builders: names,
                        groups: vec![],
                    },
                );
                submodules.push(module);
            }
        }

        let sub = [rest];
        let mut builder = self.builder(&sub, false);
        let imports = builder.imports();
        for name in &top_level {
            imports.add_submodule_import(
                "._request_builders",
                name,
                ImportType::Local,
                TypingSection::Regular,
            );
        }
        for module in &submodules {
            imports.add_submodule_import(".", module, ImportType::Local, TypingSection::Regular);
        }
        self.push(
            &sub,
            "__init__.py",
            builder,
            ArtifactBody::RequestBuildersInit {
                request_builders: top_level,
                groups: submodules,
            },
        );
        Ok(())
    }

    /// Plans the file that maps every public generated name to its
    /// cross-language definition ID. Names without an ID are left out.
    fn cross_language_definitions(&mut self) {
        let model = self.model;
        let namespace = model.namespace;
        let mut definitions = IndexMap::new();
        for id in model.public_model_types() {
            if let Some(model_type) = model.types.get(id).as_model()
                && let Some(definition) = model_type.cross_language_definition_id
            {
                definitions.insert(format!("{namespace}.models.{}", model_type.name), definition);
            }
        }
        for id in model.enums() {
            if let Some(ty) = model.types.get(id).as_enum()
                && !ty.internal
                && let Some(definition) = ty.cross_language_definition_id
            {
                definitions.insert(format!("{namespace}.models.{}", ty.name), definition);
            }
        }
        let packages: &[&str] = match model.config.no_async {
            true => &[""],
            false => &["", ".aio"],
        };
        for client in &model.clients {
            for group in &client.operation_groups {
                let owner = match group.is_mixin() {
                    true => client.name.to_owned(),
                    false => format!("operations.{}", self.names.class_name(client, group)),
                };
                let operations = group
                    .operations
                    .iter()
                    .map(|&index| client.operation(index))
                    .filter(|op| !op.name.starts_with('_'));
                for op in operations {
                    let Some(definition) = op.cross_language_definition_id else {
                        continue;
                    };
                    for package in packages {
                        definitions
                            .insert(format!("{namespace}{package}.{owner}.{}", op.name), definition);
                    }
                }
            }
        }

        let builder = self.builder(&[], false);
        self.push_path(
            CROSS_LANGUAGE_DEFINITIONS_FILE.to_owned(),
            namespace.to_owned(),
            builder,
            ArtifactBody::CrossLanguageDefinitions {
                package_id: model.cross_language_package_id,
                definitions,
            },
        );
    }
}

/// Imports the classes of `group`'s named child groups that are
/// defined in other modules than `module`.
fn add_child_group_imports<'a>(
    imports: &mut FileImport,
    modules: &FxHashMap<NodeId<'a>, (String, String)>,
    module: &str,
    group: &OperationGroup<'a>,
) {
    let children = group
        .operation_groups
        .iter()
        .filter(|child| !child.is_mixin())
        .filter_map(|child| modules.get(&child.id));
    for (class_name, child_module) in children {
        if child_module != module {
            imports.add_submodule_import(
                &format!(".{child_module}"),
                class_name,
                ImportType::Local,
                TypingSection::Regular,
            );
        }
    }
}

fn add_patch_imports(imports: &mut FileImport) {
    imports.add_submodule_import_as(
        "._patch",
        "__all__",
        "_patch_all",
        ImportType::Local,
        TypingSection::Regular,
    );
    imports.add_submodule_import("._patch", "*", ImportType::Local, TypingSection::Regular);
    imports.add_submodule_import_as(
        "._patch",
        "patch_sdk",
        "_patch_sdk",
        ImportType::Local,
        TypingSection::Regular,
    );
}
