// Favorite toggle flow. The state machine is deliberately conservative: no
// optimistic flip before the server confirms, the control is disabled while a
// mutation is in flight, and after success the new status is never set
// locally. Instead the related cache keys are invalidated and truth is
// recomputed from the server on the next read.

use crate::cache::{KeyPattern, QueryCache, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteAction {
    Add,
    Remove,
}

/// Per-vehicle toggle state as seen by one control instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// Status not loaded yet; a click does nothing.
    Unknown,
    Known(bool),
    /// A mutation is in flight. `prior` is restored on failure.
    Mutating {
        prior: bool,
        action: FavoriteAction,
    },
}

impl ToggleState {
    /// Handles a click. Returns the in-flight state and the mutation to run,
    /// or None when no mutation may start (status unknown, or one already in
    /// flight - the disabled control is what serializes mutations per
    /// vehicle).
    pub fn begin_toggle(self) -> Option<(ToggleState, FavoriteAction)> {
        match self {
            ToggleState::Known(is_favorite) => {
                let action = if is_favorite {
                    FavoriteAction::Remove
                } else {
                    FavoriteAction::Add
                };
                Some((
                    ToggleState::Mutating {
                        prior: is_favorite,
                        action,
                    },
                    action,
                ))
            }
            ToggleState::Unknown | ToggleState::Mutating { .. } => None,
        }
    }

    /// The mutation resolved successfully. The resulting boolean follows the
    /// action that was confirmed; the caller still invalidates so the cached
    /// status is refetched rather than trusted.
    pub fn complete(self) -> ToggleState {
        match self {
            ToggleState::Mutating { action, .. } => {
                ToggleState::Known(action == FavoriteAction::Add)
            }
            other => other,
        }
    }

    /// The mutation failed; fall back to the last confirmed status.
    pub fn fail(self) -> ToggleState {
        match self {
            ToggleState::Mutating { prior, .. } => ToggleState::Known(prior),
            other => other,
        }
    }

    pub fn is_mutating(self) -> bool {
        matches!(self, ToggleState::Mutating { .. })
    }
}

/// Invalidation set applied after a successful add or remove: the vehicle's
/// own status check, the favorites list, and the vehicle collections whose
/// cards display favorite state.
pub async fn invalidate_after_favorite_mutation(cache: &QueryCache, vehicle_id: i64) {
    cache.invalidate(&KeyPattern::Resource(Resource::Favorites)).await;
    cache.invalidate(&KeyPattern::FavoriteCheck(vehicle_id)).await;
    cache.invalidate(&KeyPattern::Resource(Resource::Vehicles)).await;
    cache.invalidate(&KeyPattern::Resource(Resource::Featured)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedPayload, QueryKey};

    #[test]
    fn unknown_status_never_starts_a_mutation() {
        assert_eq!(ToggleState::Unknown.begin_toggle(), None);
    }

    #[test]
    fn click_direction_follows_the_known_status() {
        let (state, action) = ToggleState::Known(false).begin_toggle().unwrap();
        assert_eq!(action, FavoriteAction::Add);
        assert!(state.is_mutating());

        let (_, action) = ToggleState::Known(true).begin_toggle().unwrap();
        assert_eq!(action, FavoriteAction::Remove);
    }

    #[test]
    fn a_second_click_while_mutating_is_ignored() {
        let (state, _) = ToggleState::Known(false).begin_toggle().unwrap();
        assert_eq!(state.begin_toggle(), None);
    }

    #[test]
    fn success_lands_on_the_confirmed_status() {
        let (state, _) = ToggleState::Known(false).begin_toggle().unwrap();
        assert_eq!(state.complete(), ToggleState::Known(true));

        let (state, _) = ToggleState::Known(true).begin_toggle().unwrap();
        assert_eq!(state.complete(), ToggleState::Known(false));
    }

    #[test]
    fn failure_restores_the_prior_status() {
        let (state, _) = ToggleState::Known(true).begin_toggle().unwrap();
        assert_eq!(state.fail(), ToggleState::Known(true));

        let (state, _) = ToggleState::Known(false).begin_toggle().unwrap();
        assert_eq!(state.fail(), ToggleState::Known(false));
    }

    #[tokio::test]
    async fn successful_mutation_marks_the_whole_related_key_set_stale() {
        let cache = QueryCache::default();
        let seed = |payload: CachedPayload| {
            move || {
                let payload = payload.clone();
                async move { Ok(payload) }
            }
        };

        let favorites = QueryKey::favorites("tok");
        let check = QueryKey::favorite_check("tok", 42);
        let other_check = QueryKey::favorite_check("tok", 7);
        let vehicles = QueryKey::vehicles(&crate::filters::VehicleFilters::default(), 12);
        let featured = QueryKey::featured();

        for key in [&favorites, &vehicles, &featured] {
            cache
                .get_or_fetch(key.clone(), seed(CachedPayload::Vehicles(Vec::new())))
                .await
                .unwrap();
        }
        for key in [&check, &other_check] {
            cache
                .get_or_fetch(key.clone(), seed(CachedPayload::FavoriteStatus(true)))
                .await
                .unwrap();
        }

        invalidate_after_favorite_mutation(&cache, 42).await;

        assert!(cache.is_stale(&favorites).await);
        assert!(cache.is_stale(&check).await);
        assert!(cache.is_stale(&vehicles).await);
        assert!(cache.is_stale(&featured).await);
        // Another vehicle's status check is untouched
        assert!(!cache.is_stale(&other_check).await);
    }
}
