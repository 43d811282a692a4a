//! Base/dependent classification of canonical entities.
//!
//! A source either names an entity's parent outright (`parent_ref`) or only
//! hints that the entity is an addon (`dependent_hint` on a record with nothing
//! to launch). Explicit references are normalized with the entity's own source
//! rule; hinted addons get a parent only when one base entity shares their
//! secondary key. References to entities outside this run stay dangling.

use std::collections::{HashMap, HashSet};

use shelf_core::{
    CanonicalEntity, FieldName, Identifier, ParentLink, ParentStatus, ReconcileError,
    SecondaryKey,
};

/// Longest parent chain followed before giving up.
pub const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    pub dependents: usize,
    pub explicit: usize,
    pub inferred: usize,
    pub dangling: usize,
    pub cycles: usize,
}

/// Set `parent` and `dependent` on every entity; return the problems found.
pub fn resolve_relationships(
    entities: &mut [CanonicalEntity],
) -> (Vec<ReconcileError>, ResolveStats) {
    let mut errors = Vec::new();
    let mut stats = ResolveStats::default();

    apply_explicit_parents(entities, &mut errors, &mut stats);
    infer_structural_parents(entities, &mut stats);

    let index = identity_index(entities);
    for entity in entities.iter_mut() {
        let Some(link) = entity.parent.as_mut() else {
            continue;
        };
        match index.get(&link.id) {
            Some(target) => {
                link.status = ParentStatus::Resolved;
                // Parents named by an installation-time alias point at the canonical id.
                link.id = target.clone();
            }
            None => {
                log::debug!("{}: parent {} is not in this run", entity.id, link.id);
                link.status = ParentStatus::Dangling;
                stats.dangling += 1;
            }
        }
    }

    detect_cycles(entities, &mut errors, &mut stats);

    stats.dependents = entities.iter().filter(|e| e.is_dependent()).count();
    (errors, stats)
}

fn apply_explicit_parents(
    entities: &mut [CanonicalEntity],
    errors: &mut Vec<ReconcileError>,
    stats: &mut ResolveStats,
) {
    for entity in entities.iter_mut() {
        let Some(raw) = entity.fields.text(FieldName::ParentRef) else {
            continue;
        };
        entity.dependent = true;
        match Identifier::parse(raw, entity.origin) {
            Some(parent) => {
                stats.explicit += 1;
                entity.parent = Some(ParentLink {
                    id: parent,
                    status: ParentStatus::Dangling,
                    inferred: false,
                });
            }
            None => {
                errors.push(ReconcileError::malformed(
                    entity.origin,
                    entity.label(),
                    format!("unusable parent reference '{}'", raw),
                ));
            }
        }
    }
}

/// Addons without a launch target of their own, flagged by their source.
fn is_structural_dependent(entity: &CanonicalEntity) -> bool {
    entity.fields.bool(FieldName::DependentHint) == Some(true)
        && !entity.fields.contains(FieldName::Executable)
        && !entity.fields.contains(FieldName::LaunchCommand)
}

fn infer_structural_parents(entities: &mut [CanonicalEntity], stats: &mut ResolveStats) {
    for entity in entities.iter_mut() {
        if entity.parent.is_none() && is_structural_dependent(entity) {
            entity.dependent = true;
        }
    }

    let mut bases: HashMap<&SecondaryKey, Vec<&Identifier>> = HashMap::new();
    for entity in entities.iter().filter(|e| !e.is_dependent()) {
        if let Some(key) = &entity.secondary_key {
            bases.entry(key).or_default().push(&entity.id);
        }
    }

    let inferred: Vec<(usize, Identifier)> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.dependent && e.parent.is_none())
        .filter_map(|(i, e)| {
            let key = e.secondary_key.as_ref()?;
            match bases.get(key).map(Vec::as_slice) {
                Some([base]) => Some((i, (*base).clone())),
                _ => None,
            }
        })
        .collect();

    for (i, parent) in inferred {
        stats.inferred += 1;
        entities[i].parent = Some(ParentLink {
            id: parent,
            status: ParentStatus::Dangling,
            inferred: true,
        });
    }
}

fn identity_index(entities: &[CanonicalEntity]) -> HashMap<Identifier, Identifier> {
    let mut index = HashMap::new();
    for entity in entities {
        index.insert(entity.id.clone(), entity.id.clone());
        for alias in &entity.aliases {
            index.entry(alias.clone()).or_insert_with(|| entity.id.clone());
        }
    }
    index
}

/// Follow resolved parents from each entity, bounded by [`MAX_PARENT_DEPTH`].
fn detect_cycles(
    entities: &mut [CanonicalEntity],
    errors: &mut Vec<ReconcileError>,
    stats: &mut ResolveStats,
) {
    let position: HashMap<&Identifier, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (&e.id, i))
        .collect();
    let parent_of = |i: usize| -> Option<usize> {
        let link = entities[i].parent.as_ref()?;
        if link.status != ParentStatus::Resolved {
            return None;
        }
        position.get(&link.id).copied()
    };

    let mut cyclic = Vec::new();
    for start in 0..entities.len() {
        let mut visited = HashSet::new();
        let mut current = parent_of(start);
        let mut depth = 1;
        while let Some(node) = current {
            if node == start {
                cyclic.push(start);
                break;
            }
            if !visited.insert(node) {
                // A cycle further up the chain; its members report it.
                break;
            }
            current = parent_of(node);
            if current.is_some() && depth >= MAX_PARENT_DEPTH {
                errors.push(ReconcileError::ParentChainTooDeep {
                    id: entities[start].id.clone(),
                    limit: MAX_PARENT_DEPTH,
                });
                break;
            }
            depth += 1;
        }
    }

    for i in cyclic {
        stats.cycles += 1;
        if let Some(link) = entities[i].parent.as_mut() {
            link.status = ParentStatus::Cyclic;
        }
        errors.push(ReconcileError::CyclicParent {
            id: entities[i].id.clone(),
        });
    }
}

#[cfg(test)]
#[path = "tests/relationship_tests.rs"]
mod tests;
