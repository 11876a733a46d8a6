//! Association wiring for one connection's complete model set.

use crate::error::AssociationError;
use crate::model::factory::Siblings;
use crate::model::loader::LoadedModel;
use crate::model::types::ModelMap;

/// Run every association hook against the sibling models of `connection` and attach the results.
/// Takes the whole loaded set, so wiring cannot start on a partial graph.
pub fn wire_associations(connection: &str, loaded: Vec<LoadedModel>) -> Result<ModelMap, AssociationError> {
    let mut models = ModelMap::with_capacity(loaded.len());
    let mut factories = Vec::with_capacity(loaded.len());
    for LoadedModel { factory, definition } in loaded {
        factories.push((definition.name.clone(), factory));
        models.insert(definition.name.clone(), definition);
    }

    let mut wired = Vec::new();
    {
        let siblings = Siblings::new(connection, &models);
        for (name, factory) in &factories {
            let (Some(hook), Some(model)) = (factory.association_hook(), models.get(name)) else {
                continue;
            };
            let associations = hook.associate(model, &siblings)?;
            for association in &associations {
                siblings.check(name, association)?;
            }
            tracing::debug!(db = %connection, model = %name, count = associations.len(), "associations wired");
            wired.push((name.clone(), associations));
        }
    }

    for (name, associations) in wired {
        if let Some(model) = models.get_mut(&name) {
            model.attach(associations);
        }
    }
    Ok(models)
}
