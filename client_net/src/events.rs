//! Events raised to the presentation layer.
//!
//! Handlers validate and apply every packet before notifying, so observers
//! receive ground truth and never re-validate. All notifications are one-way
//! and fire-and-forget; an observer must not call back into the session from
//! inside a notification.

use client_shared::math::Vec3;
use client_shared::packets::{DiscordActivityPacket, PlayerId};
use client_shared::state::{GameFlags, PlayerState};

use crate::players::PlayerRecord;

/// Presentation-layer observer. Every method has an empty default body, so
/// implementations only override what they render.
pub trait GameEventObserver {
    fn on_map_change(&mut self, _map_name: &str) {}

    fn on_local_player_joined(&mut self, _player: &PlayerRecord) {}

    fn on_player_joined(&mut self, _player: &PlayerRecord) {}

    fn on_player_left(&mut self, _id: PlayerId, _name: &str) {}

    fn on_player_position_update(&mut self, _id: PlayerId, _position: Vec3) {}

    fn on_player_state_update(&mut self, _id: PlayerId, _state: &PlayerState) {}

    fn on_player_died(&mut self, _id: PlayerId) {}

    fn on_player_respawned(&mut self, _id: PlayerId) {}

    fn on_spell_cast(&mut self, _caster: PlayerId, _spell_id: u16) {}

    fn on_spell_cast_on_target(&mut self, _caster: PlayerId, _target: PlayerId, _spell_id: u16) {}

    fn on_item_dropped(&mut self, _id: PlayerId, _item_instance: u16, _amount: u16) {}

    fn on_item_taken(&mut self, _id: PlayerId, _item_instance: u16) {}

    fn on_whisper(&mut self, _sender: PlayerId, _sender_name: &str, _message: &str) {}

    fn on_chat_message(&mut self, _sender: PlayerId, _sender_name: &str, _message: &str) {}

    fn on_server_message(&mut self, _message: &str) {}

    fn on_rcon_response(&mut self, _message: &str, _is_admin: bool) {}

    fn on_game_info(&mut self, _raw_game_time: u32, _flags: GameFlags) {}

    fn on_discord_activity(&mut self, _activity: &DiscordActivityPacket) {}

    fn on_connection_lost(&mut self) {}

    fn on_disconnected(&mut self) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl GameEventObserver for NullObserver {}
