//! Post-merge inclusion policy.
//!
//! Excluded entities are not dropped: each is replaced in the stream by one
//! [`ReconcileError::Excluded`] naming the reason, so a filtered run can still
//! be audited.

use shelf_core::{CanonicalEntity, Exclusion, Outcome, ReconcileError, ReconcilePolicy};

/// The first policy rule that excludes `entity`, if any.
///
/// Rules are checked in a fixed order: hidden, not installed, not owned,
/// dependent.
pub fn exclusion_reason(entity: &CanonicalEntity, policy: &ReconcilePolicy) -> Option<Exclusion> {
    if entity.is_hidden() && !policy.include_hidden {
        Some(Exclusion::Hidden)
    } else if policy.installed_only && !entity.is_installed() {
        Some(Exclusion::NotInstalled)
    } else if policy.owned_only && !entity.owned {
        Some(Exclusion::NotOwned)
    } else if policy.base_only && entity.is_dependent() {
        Some(Exclusion::Dependent)
    } else {
        None
    }
}

/// Iterator adapter applying a [`ReconcilePolicy`] to outcomes as they are pulled.
pub struct PolicyFilter<I> {
    inner: I,
    policy: ReconcilePolicy,
    excluded: usize,
}

impl<I> PolicyFilter<I> {
    /// Number of entities excluded so far.
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}

impl<I> Iterator for PolicyFilter<I>
where
    I: Iterator,
    I::Item: Into<Outcome>,
{
    type Item = Outcome;

    fn next(&mut self) -> Option<Outcome> {
        let entity = match self.inner.next()?.into() {
            Outcome::Entity(entity) => entity,
            other => return Some(other),
        };
        match exclusion_reason(&entity, &self.policy) {
            Some(reason) => {
                self.excluded += 1;
                log::debug!("Excluding {}: {}", entity.label(), reason);
                Some(Outcome::Error(ReconcileError::Excluded {
                    label: entity.label(),
                    id: entity.id,
                    reason,
                }))
            }
            None => Some(Outcome::Entity(entity)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Apply `policy` lazily to a sequence of entities or outcomes.
pub fn filter<I>(items: I, policy: &ReconcilePolicy) -> PolicyFilter<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Into<Outcome>,
{
    PolicyFilter {
        inner: items.into_iter(),
        policy: policy.clone(),
        excluded: 0,
    }
}

#[cfg(test)]
mod tests {
    use shelf_core::{
        FieldName, Fields, Identifier, InstallState, ParentLink, ParentStatus, SourceKind,
    };

    use super::*;

    fn entity(key: &str, installed: bool, owned: bool) -> CanonicalEntity {
        CanonicalEntity {
            id: Identifier::parse(key, SourceKind::Steam).unwrap(),
            aliases: Vec::new(),
            secondary_key: None,
            origin: SourceKind::Steam,
            install_state: if installed {
                InstallState::Installed
            } else {
                InstallState::OwnedNotInstalled
            },
            owned,
            fields: Fields::new().with(FieldName::Name, format!("Game {key}")),
            parent: None,
            dependent: false,
            matched_by: None,
        }
    }

    #[test]
    fn default_policy_keeps_everything_visible() {
        let policy = ReconcilePolicy::default();
        assert_eq!(exclusion_reason(&entity("1", false, true), &policy), None);
        assert_eq!(exclusion_reason(&entity("2", true, false), &policy), None);
    }

    #[test]
    fn hidden_is_excluded_unless_included() {
        let mut e = entity("1", true, true);
        e.fields = e.fields.with(FieldName::Hidden, true);
        assert_eq!(
            exclusion_reason(&e, &ReconcilePolicy::default()),
            Some(Exclusion::Hidden)
        );
        assert_eq!(
            exclusion_reason(&e, &ReconcilePolicy::new().include_hidden(true)),
            None
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = ReconcilePolicy::new().installed_only(true).owned_only(true);
        assert_eq!(
            exclusion_reason(&entity("1", false, false), &policy),
            Some(Exclusion::NotInstalled)
        );
        assert_eq!(
            exclusion_reason(&entity("2", true, false), &policy),
            Some(Exclusion::NotOwned)
        );
    }

    #[test]
    fn base_only_excludes_dangling_dependents_too() {
        let mut e = entity("5", false, true);
        e.parent = Some(ParentLink {
            id: Identifier::parse("1", SourceKind::Steam).unwrap(),
            status: ParentStatus::Dangling,
            inferred: false,
        });
        assert_eq!(
            exclusion_reason(&e, &ReconcilePolicy::new().base_only(true)),
            Some(Exclusion::Dependent)
        );
    }

    #[test]
    fn filter_replaces_excluded_entities_in_place() {
        let policy = ReconcilePolicy::new().installed_only(true);
        let mut stream = filter(
            vec![entity("1", true, true), entity("2", false, true), entity("3", true, false)],
            &policy,
        );

        assert!(stream.next().unwrap().is_entity());
        let excluded = stream.next().unwrap();
        assert_eq!(
            excluded.error().unwrap().to_string(),
            "Game 2 (2) is not installed, excluded by policy"
        );
        assert!(stream.next().unwrap().is_entity());
        assert!(stream.next().is_none());
        assert_eq!(stream.excluded(), 1);
    }
}
