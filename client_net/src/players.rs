//! Authoritative client-side mirror of player records.
//!
//! The manager owns one [`PlayerRecord`] per currently-tracked player, local
//! and remote alike. Records are created on first sight of an id and die with
//! an explicit left-game packet or a full disconnect; the interpolation state
//! lives inside the record, so removal tears both down together.

use std::collections::HashMap;
use std::time::Duration;

use client_shared::math::Vec3;
use client_shared::packets::PlayerId;
use client_shared::state::{PlayerAppearance, PlayerState, WeaponMode};
use tracing::warn;

use crate::interp::{AnimationCatalog, Interpolator};

/// Everything the client knows about one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub head_direction: f32,
    pub left_hand_item: u16,
    pub right_hand_item: u16,
    pub equipped_armor: u16,
    pub health: i16,
    pub mana: i16,
    pub animation: u16,
    pub weapon_mode: WeaponMode,
    pub active_spell: u16,
    pub melee_weapon: u16,
    pub ranged_weapon: u16,
    pub appearance: PlayerAppearance,
    pub is_local: bool,
    pub interp: Interpolator,
}

impl PlayerRecord {
    fn new(id: PlayerId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Applies every non-position field of a state snapshot. Position routing
    /// is the caller's decision (direct for the local player, via the
    /// interpolator for remotes).
    pub fn apply_state(&mut self, state: &PlayerState) {
        self.rotation = state.rotation;
        self.head_direction = state.head_direction;
        self.left_hand_item = state.left_hand_item;
        self.right_hand_item = state.right_hand_item;
        self.equipped_armor = state.equipped_armor;
        self.health = state.health;
        self.mana = state.mana;
        self.animation = state.animation;
        self.weapon_mode = state.weapon_mode;
        self.active_spell = state.active_spell;
        self.melee_weapon = state.melee_weapon;
        self.ranged_weapon = state.ranged_weapon;
    }

    /// Adopts a state snapshot's animation, refreshing the velocity estimate
    /// when the animation actually changed.
    pub fn apply_animation(&mut self, animation: u16, catalog: &AnimationCatalog) {
        if self.animation != animation {
            self.interp.update_animation(animation, catalog);
        }
        self.animation = animation;
    }
}

/// Id-keyed store of tracked players.
#[derive(Default)]
pub struct PlayerManager {
    players: HashMap<PlayerId, PlayerRecord>,
    local_id: Option<PlayerId>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record for the local player. Any previous local player is
    /// replaced, whatever its id.
    pub fn create_local_player(&mut self, id: PlayerId) -> &mut PlayerRecord {
        if let Some(old) = self.local_id.take() {
            self.players.remove(&old);
        }
        let mut record = PlayerRecord::new(id);
        record.is_local = true;
        self.local_id = Some(id);
        self.players.insert(id, record);
        self.players.get_mut(&id).expect("record just inserted")
    }

    /// Creates a remote player record. A duplicate id replaces the existing
    /// record.
    pub fn create_player(&mut self, id: PlayerId) -> &mut PlayerRecord {
        if self.players.contains_key(&id) {
            warn!(%id, "duplicate player id, replacing record");
            if self.local_id == Some(id) {
                self.local_id = None;
            }
        }
        self.players.insert(id, PlayerRecord::new(id));
        self.players.get_mut(&id).expect("record just inserted")
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerRecord> {
        self.players.get_mut(&id)
    }

    pub fn local_player(&self) -> Option<&PlayerRecord> {
        self.local_id.and_then(|id| self.players.get(&id))
    }

    /// Display name for an id, empty when unknown.
    pub fn player_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Removes a record. Absent ids are a no-op.
    pub fn remove_player(&mut self, id: PlayerId) {
        if self.local_id == Some(id) {
            self.local_id = None;
        }
        self.players.remove(&id);
    }

    /// Drops every record, local player included. Used on full disconnect.
    pub fn clear(&mut self) {
        self.players.clear();
        self.local_id = None;
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Advances interpolation for every remote player by one tick.
    pub fn step_interpolation(&mut self, frame: Duration) {
        for record in self.players.values_mut() {
            if record.is_local {
                continue;
            }
            if let Some(next) = record.interp.step(record.position, frame) {
                record.position = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_create_replaces_record() {
        let mut manager = PlayerManager::new();
        manager.create_player(PlayerId(1)).name = "first".to_string();
        manager.create_player(PlayerId(1)).name = "second".to_string();

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get_player(PlayerId(1)).unwrap().name, "second");
    }

    #[test]
    fn remove_then_get_returns_absent() {
        let mut manager = PlayerManager::new();
        manager.create_player(PlayerId(1));
        manager.remove_player(PlayerId(1));
        assert!(manager.get_player(PlayerId(1)).is_none());

        // Removing again is a no-op, not an error.
        manager.remove_player(PlayerId(1));
    }

    #[test]
    fn at_most_one_local_player() {
        let mut manager = PlayerManager::new();
        manager.create_local_player(PlayerId(1));
        manager.create_player(PlayerId(2));
        manager.create_local_player(PlayerId(3));

        let locals: Vec<_> = manager.iter().filter(|p| p.is_local).collect();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].id, PlayerId(3));
        // The old local record is gone entirely.
        assert!(manager.get_player(PlayerId(1)).is_none());
        assert_eq!(manager.local_player().unwrap().id, PlayerId(3));
    }

    #[test]
    fn clear_drops_everything() {
        let mut manager = PlayerManager::new();
        manager.create_local_player(PlayerId(1));
        manager.create_player(PlayerId(2));

        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.local_player().is_none());
    }

    #[test]
    fn interpolation_state_dies_with_the_record() {
        let mut manager = PlayerManager::new();
        let record = manager.create_player(PlayerId(5));
        record.interp.update_target(Vec3::new(50.0, 0.0, 0.0));
        assert!(record.interp.is_interpolating());

        manager.remove_player(PlayerId(5));
        assert!(manager.get_player(PlayerId(5)).is_none());
    }

    #[test]
    fn step_interpolation_moves_remote_players_only() {
        let mut manager = PlayerManager::new();
        manager.create_local_player(PlayerId(1)).interp.update_target(Vec3::new(50.0, 0.0, 0.0));
        manager
            .create_player(PlayerId(2))
            .interp
            .update_target(Vec3::new(50.0, 0.0, 0.0));

        manager.step_interpolation(Duration::from_millis(100));

        assert_eq!(manager.get_player(PlayerId(1)).unwrap().position, Vec3::ZERO);
        assert!(manager.get_player(PlayerId(2)).unwrap().position.x > 0.0);
    }
}
