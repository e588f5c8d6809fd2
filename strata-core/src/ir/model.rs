use tracing::debug;

use crate::{
    config::Configuration,
    error::GenerateError,
    parse::Document,
};

use super::{
    client::{Client, ClientBuilder, discover_types},
    inheritance::sort_model_types,
    registry::{TypeRegistry, TypeRegistryBuilder, TypeSettings},
    types::TypeId,
};

/// Everything one generation run knows: the resolved configuration,
/// the frozen type registry, and the client graph.
///
/// A code model is read-only once built. Every later stage
/// borrows it.
#[derive(Debug)]
pub struct CodeModel<'a> {
    pub namespace: &'a str,
    /// Identifies the package to other languages' generators.
    pub cross_language_package_id: Option<&'a str>,
    pub config: Configuration,
    pub types: TypeRegistry<'a>,
    pub clients: Vec<Client<'a>>,
    /// Models to emit, parents before children.
    pub model_types: Vec<TypeId>,
}

impl<'a> CodeModel<'a> {
    pub fn new(doc: &'a Document, config: Configuration) -> Result<Self, GenerateError> {
        let root = doc.root();
        let namespace = root.required_str("namespace")?;

        let mut builder = TypeRegistryBuilder::new(TypeSettings::new(namespace, &config));
        for ty in root.items("types")? {
            builder.build_type(ty)?;
        }
        let client_nodes = root.items("clients")?;
        for &client in &client_nodes {
            discover_types(&mut builder, client)?;
        }
        let types = builder.finish()?;
        debug!(namespace, types = types.len(), "built type registry");

        // Models that aren't used anywhere aren't emitted.
        let candidates = types
            .models()
            .filter(|(_, model)| !model.usage.is_empty())
            .map(|(id, _)| id);
        let model_types = if config.models_mode.is_enabled() {
            sort_model_types(&types, candidates)?
        } else {
            candidates.collect()
        };

        let clients = client_nodes
            .into_iter()
            .map(|client| ClientBuilder::new(&types, &config).build(client))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            namespace,
            cross_language_package_id: root.str("crossLanguagePackageId")?,
            config,
            types,
            clients,
            model_types,
        })
    }

    /// Returns the models that are emitted as classes,
    /// parents before children.
    pub fn public_model_types(&self) -> impl Iterator<Item = TypeId> {
        self.model_types.iter().copied().filter(|&id| {
            self.types
                .get(id)
                .as_model()
                .is_some_and(|model| model.is_public())
        })
    }

    /// Returns every enum, sorted by name.
    pub fn enums(&self) -> Vec<TypeId> {
        let mut enums: Vec<_> = self.types.enums().collect();
        enums.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));
        enums.into_iter().map(|(id, _)| id).collect()
    }

    /// Returns every named union, sorted by name.
    pub fn named_unions(&self) -> Vec<TypeId> {
        let mut unions: Vec<_> = self.types.named_unions().collect();
        unions.sort_by_key(|(_, union)| union.name);
        unions.into_iter().map(|(id, _)| id).collect()
    }

    #[inline]
    pub fn has_operations(&self) -> bool {
        self.clients.iter().any(|client| client.has_operations())
    }

    #[inline]
    pub fn has_abstract_operations(&self) -> bool {
        self.clients
            .iter()
            .any(|client| client.has_abstract_operations())
    }

    /// Returns `true` if any client exposes operations directly,
    /// which needs a shared base class.
    #[inline]
    pub fn need_mixin_abc(&self) -> bool {
        self.config.show_operations && self.clients.iter().any(|client| client.has_mixin())
    }

    #[inline]
    pub fn need_vendored_code(&self) -> bool {
        self.need_mixin_abc() || self.has_abstract_operations()
    }

    /// Returns the name of the folder for operation files.
    pub fn operations_folder_name(&self) -> &'static str {
        let only_mixins = self
            .clients
            .iter()
            .flat_map(|client| &client.operation_groups)
            .all(|group| group.is_mixin());
        if self.config.version_tolerant && only_mixins {
            "_operations"
        } else {
            "operations"
        }
    }

    /// Returns `true` if models are emitted at all.
    pub fn has_models(&self) -> bool {
        self.config.models_mode.is_enabled()
            && (self.public_model_types().next().is_some() || self.types.enums().next().is_some())
    }
}
