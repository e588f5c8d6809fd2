use rustc_hash::FxHashSet;
use unicase::UniCase;

use super::{
    error::DuplicateNameError,
    registry::TypeRegistry,
    types::{ModelType, TypeId},
};

/// Orders models so that every model comes after all of its parents.
///
/// Models are visited in case-insensitive name order, and each model's
/// parents are visited depth-first before the model itself, so the
/// result is deterministic for the same input. Candidates that aren't
/// models are skipped. Fails if two different models have the same name.
pub fn sort_model_types(
    registry: &TypeRegistry<'_>,
    candidates: impl IntoIterator<Item = TypeId>,
) -> Result<Vec<TypeId>, DuplicateNameError> {
    let mut models: Vec<_> = candidates
        .into_iter()
        .filter_map(|id| registry.get(id).as_model().map(|model| (id, model)))
        .collect();
    models.sort_by_key(|(_, model)| UniCase::new(model.name));

    let mut sorter = Sorter {
        registry,
        seen_ids: FxHashSet::default(),
        seen_names: FxHashSet::default(),
        sorted: Vec::with_capacity(models.len()),
    };
    for (id, model) in models {
        sorter.visit(id, model)?;
    }
    Ok(sorter.sorted)
}

struct Sorter<'r, 'a> {
    registry: &'r TypeRegistry<'a>,
    seen_ids: FxHashSet<TypeId>,
    seen_names: FxHashSet<&'a str>,
    sorted: Vec<TypeId>,
}

impl<'r, 'a> Sorter<'r, 'a> {
    fn visit(&mut self, id: TypeId, model: &'r ModelType<'a>) -> Result<(), DuplicateNameError> {
        if !self.seen_ids.insert(id) {
            return Ok(());
        }
        if !self.seen_names.insert(model.name) {
            return Err(DuplicateNameError {
                name: model.name.to_owned(),
            });
        }
        for &parent in &model.parents {
            if let Some(parent_model) = self.registry.get(parent).as_model() {
                self.visit(parent, parent_model)?;
            }
        }
        self.sorted.push(id);
        Ok(())
    }
}
