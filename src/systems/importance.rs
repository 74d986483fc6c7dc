//! Entity importance classification
//!
//! Important entities are exempt from trimming and from replication
//! suppression. The predicate is pure; callers re-evaluate it against live
//! state at decision time rather than trusting a snapshot taken earlier.

use crate::snapshot::ObserverSnapshot;
use crate::systems::observer;
use crate::util::vec2::Vec2;

/// Projectile damage above which a projectile is always kept
pub const HIGH_DAMAGE_THRESHOLD: i32 = 50;

/// Live NPC fields the importance and replication predicates read
#[derive(Debug, Clone, Copy)]
pub struct NpcView {
    pub slot: usize,
    pub position: Vec2,
    pub boss: bool,
    /// Host flags this NPC as always replicated (e.g. world-critical actors)
    pub always_sync: bool,
    pub friendly: bool,
    /// Took damage since the last tick
    pub just_damaged: bool,
    /// Negative means actively losing life (poison, on fire)
    pub life_regen: i32,
    /// Position of the NPC's current AI target, if it has one
    pub target: Option<Vec2>,
}

/// Live projectile fields the importance and replication predicates read
#[derive(Debug, Clone, Copy)]
pub struct ProjectileView {
    pub slot: usize,
    pub position: Vec2,
    /// Position of the owning player, if player-owned
    pub owner: Option<Vec2>,
    pub friendly: bool,
    pub hostile: bool,
    pub always_sync: bool,
    pub damage: i32,
}

/// A live entity presented to the decision predicates
#[derive(Debug, Clone, Copy)]
pub enum EntityView {
    Npc(NpcView),
    Projectile(ProjectileView),
}

impl EntityView {
    #[inline]
    pub fn slot(&self) -> usize {
        match self {
            EntityView::Npc(n) => n.slot,
            EntityView::Projectile(p) => p.slot,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        match self {
            EntityView::Npc(n) => n.position,
            EntityView::Projectile(p) => p.position,
        }
    }
}

/// True when the entity must never be trimmed or suppressed
///
/// `critical_distance` bounds the "near something that matters" checks:
/// proximity to an observer, to the entity's AI target, or (for a friendly
/// projectile) to its owner.
pub fn is_important(
    view: &EntityView,
    observers: &[ObserverSnapshot],
    critical_distance: f32,
) -> bool {
    if observer::is_near_any(view.position(), observers, critical_distance) {
        return true;
    }
    match view {
        EntityView::Npc(npc) => {
            npc.boss
                || npc.always_sync
                || npc.friendly
                || npc.just_damaged
                || npc.life_regen < 0
                || npc
                    .target
                    .map(|t| view.position().distance_sq_to(t) <= critical_distance * critical_distance)
                    .unwrap_or(false)
        }
        EntityView::Projectile(proj) => {
            proj.always_sync
                || proj.owner.is_some() && proj.friendly
                || proj.damage > HIGH_DAMAGE_THRESHOLD
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_npc(x: f32) -> NpcView {
        NpcView {
            slot: 0,
            position: Vec2::new(x, 0.0),
            boss: false,
            always_sync: false,
            friendly: false,
            just_damaged: false,
            life_regen: 0,
            target: None,
        }
    }

    fn plain_projectile(x: f32) -> ProjectileView {
        ProjectileView {
            slot: 0,
            position: Vec2::new(x, 0.0),
            owner: None,
            friendly: false,
            hostile: true,
            always_sync: false,
            damage: 10,
        }
    }

    fn obs(x: f32) -> ObserverSnapshot {
        ObserverSnapshot {
            position: Vec2::new(x, 0.0),
        }
    }

    #[test]
    fn test_distant_plain_npc_is_unimportant() {
        let view = EntityView::Npc(plain_npc(5000.0));
        assert!(!is_important(&view, &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_boss_is_important_anywhere() {
        let mut npc = plain_npc(5000.0);
        npc.boss = true;
        assert!(is_important(&EntityView::Npc(npc), &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_negative_regen_is_important() {
        let mut npc = plain_npc(5000.0);
        npc.life_regen = -4;
        assert!(is_important(&EntityView::Npc(npc), &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_just_damaged_is_important() {
        let mut npc = plain_npc(5000.0);
        npc.just_damaged = true;
        assert!(is_important(&EntityView::Npc(npc), &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_npc_near_its_target_is_important() {
        let mut npc = plain_npc(5000.0);
        npc.target = Some(Vec2::new(5100.0, 0.0));
        assert!(is_important(&EntityView::Npc(npc), &[obs(0.0)], 1600.0));

        npc.target = Some(Vec2::new(9000.0, 0.0));
        assert!(!is_important(&EntityView::Npc(npc), &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_proximity_to_observer_is_important() {
        let view = EntityView::Npc(plain_npc(500.0));
        assert!(is_important(&view, &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_player_owned_friendly_projectile_is_important() {
        let mut proj = plain_projectile(5000.0);
        proj.friendly = true;
        proj.hostile = false;
        proj.owner = Some(Vec2::new(0.0, 0.0));
        assert!(is_important(
            &EntityView::Projectile(proj),
            &[obs(0.0)],
            1600.0
        ));
    }

    #[test]
    fn test_high_damage_projectile_is_important() {
        let mut proj = plain_projectile(5000.0);
        proj.damage = 120;
        assert!(is_important(
            &EntityView::Projectile(proj),
            &[obs(0.0)],
            1600.0
        ));
    }

    #[test]
    fn test_distant_unowned_projectile_is_unimportant() {
        let view = EntityView::Projectile(plain_projectile(5000.0));
        assert!(!is_important(&view, &[obs(0.0)], 1600.0));
    }

    #[test]
    fn test_no_observers_means_no_proximity_importance() {
        let view = EntityView::Npc(plain_npc(0.0));
        assert!(!is_important(&view, &[], 1600.0));
    }
}
