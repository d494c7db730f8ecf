//! Typed packet definitions and their wire codecs.
//!
//! Every message on the wire is a 1-byte [`PacketTag`] followed by a
//! codec-specific body. Bodies follow the layout rules in [`crate::wire`].
//! Identifier fields that a peer may legitimately omit are `Option<PlayerId>`
//! with a presence flag on the wire; there is no sentinel id value.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WireError;
use crate::math::Vec3;
use crate::state::{GameFlags, PlayerAppearance, PlayerState};
use crate::wire::{Decode, Encode, WireReader, WireWriter};

/// Opaque handle of a player, stable for the lifetime of their presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Encode for PlayerId {
    fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.0);
    }
}

impl Decode for PlayerId {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerId(r.get_u64()?))
    }
}

/// One-byte discriminator identifying a message's wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketTag {
    InitialInfo = 1,
    ActualStatistics = 2,
    MapOnly = 3,
    DoDie = 4,
    Respawn = 5,
    CastSpell = 6,
    CastSpellOnTarget = 7,
    DropItem = 8,
    TakeItem = 9,
    Whisper = 10,
    Message = 11,
    ServerMessage = 12,
    RconCommand = 13,
    ExistingPlayers = 14,
    JoinGame = 15,
    GameInfo = 16,
    LeftGame = 17,
    HpDelta = 18,
    DiscordActivity = 19,
    /// Synthesized by the transport on an orderly remote disconnect.
    DisconnectNotification = 250,
    /// Synthesized by the transport when an established connection dies.
    ConnectionLost = 251,
}

impl PacketTag {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(PacketTag::InitialInfo),
            2 => Some(PacketTag::ActualStatistics),
            3 => Some(PacketTag::MapOnly),
            4 => Some(PacketTag::DoDie),
            5 => Some(PacketTag::Respawn),
            6 => Some(PacketTag::CastSpell),
            7 => Some(PacketTag::CastSpellOnTarget),
            8 => Some(PacketTag::DropItem),
            9 => Some(PacketTag::TakeItem),
            10 => Some(PacketTag::Whisper),
            11 => Some(PacketTag::Message),
            12 => Some(PacketTag::ServerMessage),
            13 => Some(PacketTag::RconCommand),
            14 => Some(PacketTag::ExistingPlayers),
            15 => Some(PacketTag::JoinGame),
            16 => Some(PacketTag::GameInfo),
            17 => Some(PacketTag::LeftGame),
            18 => Some(PacketTag::HpDelta),
            19 => Some(PacketTag::DiscordActivity),
            250 => Some(PacketTag::DisconnectNotification),
            251 => Some(PacketTag::ConnectionLost),
            _ => None,
        }
    }
}

/// Prepends the tag byte to an encoded body.
pub fn encode_packet<T: Encode>(tag: PacketTag, body: &T) -> Bytes {
    let mut w = WireWriter::with_capacity(64);
    w.put_u8(tag as u8);
    body.encode(&mut w);
    w.freeze()
}

/// Encodes a message that is nothing but its tag.
pub fn encode_tag_only(tag: PacketTag) -> Bytes {
    let mut w = WireWriter::with_capacity(1);
    w.put_u8(tag as u8);
    w.freeze()
}

/// Sent once after the server accepts a connection: the local player's id and
/// the world to load.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialInfoPacket {
    pub player_id: PlayerId,
    pub map_name: String,
}

impl Encode for InitialInfoPacket {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
        w.put_str(&self.map_name);
    }
}

impl Decode for InitialInfoPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(InitialInfoPacket {
            player_id: PlayerId::decode(r)?,
            map_name: r.get_str()?,
        })
    }
}

/// Full state snapshot for one player. Outbound, the id is omitted because the
/// server attributes the packet to its sender.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStateUpdatePacket {
    pub player_id: Option<PlayerId>,
    pub state: PlayerState,
}

impl Encode for PlayerStateUpdatePacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.player_id);
        self.state.encode(w);
    }
}

impl Decode for PlayerStateUpdatePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerStateUpdatePacket {
            player_id: r.get_optional()?,
            state: PlayerState::decode(r)?,
        })
    }
}

/// Position-only update, the high-rate packet between full snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPositionUpdatePacket {
    pub player_id: Option<PlayerId>,
    pub position: Vec3,
}

impl Encode for PlayerPositionUpdatePacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.player_id);
        w.put_vec3(self.position);
    }
}

impl Decode for PlayerPositionUpdatePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerPositionUpdatePacket {
            player_id: r.get_optional()?,
            position: r.get_vec3()?,
        })
    }
}

/// A player died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDeathPacket {
    pub player_id: PlayerId,
}

impl Encode for PlayerDeathPacket {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
    }
}

impl Decode for PlayerDeathPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerDeathPacket {
            player_id: PlayerId::decode(r)?,
        })
    }
}

/// A player respawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRespawnPacket {
    pub player_id: PlayerId,
}

impl Encode for PlayerRespawnPacket {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
    }
}

impl Decode for PlayerRespawnPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerRespawnPacket {
            player_id: PlayerId::decode(r)?,
        })
    }
}

/// Spell cast, with or without a target. Shared by the plain and targeted
/// tags; the targeted variant requires `target_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastSpellPacket {
    pub caster_id: Option<PlayerId>,
    pub target_id: Option<PlayerId>,
    pub spell_id: u16,
}

impl Encode for CastSpellPacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.caster_id);
        w.put_optional(&self.target_id);
        w.put_u16(self.spell_id);
    }
}

impl Decode for CastSpellPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(CastSpellPacket {
            caster_id: r.get_optional()?,
            target_id: r.get_optional()?,
            spell_id: r.get_u16()?,
        })
    }
}

/// Item dropped into the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropItemPacket {
    pub player_id: Option<PlayerId>,
    pub item_instance: u16,
    pub item_amount: u16,
}

impl Encode for DropItemPacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.player_id);
        w.put_u16(self.item_instance);
        w.put_u16(self.item_amount);
    }
}

impl Decode for DropItemPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(DropItemPacket {
            player_id: r.get_optional()?,
            item_instance: r.get_u16()?,
            item_amount: r.get_u16()?,
        })
    }
}

/// Item picked up from the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeItemPacket {
    pub player_id: Option<PlayerId>,
    pub item_instance: u16,
}

impl Encode for TakeItemPacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.player_id);
        w.put_u16(self.item_instance);
    }
}

impl Decode for TakeItemPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(TakeItemPacket {
            player_id: r.get_optional()?,
            item_instance: r.get_u16()?,
        })
    }
}

/// Text message. Carried by the whisper, chat, server-message, and rcon
/// command tags; which ids are required depends on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagePacket {
    pub sender: Option<PlayerId>,
    pub recipient: Option<PlayerId>,
    pub message: String,
}

impl Encode for MessagePacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.sender);
        w.put_optional(&self.recipient);
        w.put_str(&self.message);
    }
}

impl Decode for MessagePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(MessagePacket {
            sender: r.get_optional()?,
            recipient: r.get_optional()?,
            message: r.get_str()?,
        })
    }
}

/// Inbound rcon response body (the outbound command reuses [`MessagePacket`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconResponsePacket {
    pub is_admin: bool,
    pub message: String,
}

impl Encode for RconResponsePacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.is_admin);
        w.put_str(&self.message);
    }
}

impl Decode for RconResponsePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(RconResponsePacket {
            is_admin: r.get_bool()?,
            message: r.get_str()?,
        })
    }
}

/// One entry of the existing-players batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingPlayerEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Vec3,
    pub left_hand_item: u16,
    pub right_hand_item: u16,
    pub equipped_armor: u16,
    pub appearance: PlayerAppearance,
}

impl Encode for ExistingPlayerEntry {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
        w.put_str(&self.name);
        w.put_vec3(self.position);
        w.put_u16(self.left_hand_item);
        w.put_u16(self.right_hand_item);
        w.put_u16(self.equipped_armor);
        self.appearance.encode(w);
    }
}

impl Decode for ExistingPlayerEntry {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(ExistingPlayerEntry {
            player_id: PlayerId::decode(r)?,
            name: r.get_str()?,
            position: r.get_vec3()?,
            left_hand_item: r.get_u16()?,
            right_hand_item: r.get_u16()?,
            equipped_armor: r.get_u16()?,
            appearance: PlayerAppearance::decode(r)?,
        })
    }
}

/// Everyone already in the game, sent to a freshly joined client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExistingPlayersPacket {
    pub players: Vec<ExistingPlayerEntry>,
}

impl Encode for ExistingPlayersPacket {
    fn encode(&self, w: &mut WireWriter) {
        let count = self.players.len().min(u16::MAX as usize);
        w.put_u16(count as u16);
        for entry in &self.players[..count] {
            entry.encode(w);
        }
    }
}

impl Decode for ExistingPlayersPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let count = r.get_u16()? as usize;
        let mut players = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            players.push(ExistingPlayerEntry::decode(r)?);
        }
        Ok(ExistingPlayersPacket { players })
    }
}

/// Join announcement. Outbound the id is omitted (the server assigns it);
/// inbound it identifies the newcomer.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGamePacket {
    pub player_id: Option<PlayerId>,
    pub player_name: String,
    pub position: Vec3,
    pub left_hand_item: u16,
    pub right_hand_item: u16,
    pub equipped_armor: u16,
    pub appearance: PlayerAppearance,
}

impl Encode for JoinGamePacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_optional(&self.player_id);
        w.put_str(&self.player_name);
        w.put_vec3(self.position);
        w.put_u16(self.left_hand_item);
        w.put_u16(self.right_hand_item);
        w.put_u16(self.equipped_armor);
        self.appearance.encode(w);
    }
}

impl Decode for JoinGamePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(JoinGamePacket {
            player_id: r.get_optional()?,
            player_name: r.get_str()?,
            position: r.get_vec3()?,
            left_hand_item: r.get_u16()?,
            right_hand_item: r.get_u16()?,
            equipped_armor: r.get_u16()?,
            appearance: PlayerAppearance::decode(r)?,
        })
    }
}

/// World time and server options. Inbound only; the outbound time-sync ping
/// is tag-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameInfoPacket {
    pub raw_game_time: u32,
    pub flags: GameFlags,
}

impl Encode for GameInfoPacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.raw_game_time);
        self.flags.encode(w);
    }
}

impl Decode for GameInfoPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(GameInfoPacket {
            raw_game_time: r.get_u32()?,
            flags: GameFlags::decode(r)?,
        })
    }
}

/// A player left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeftGamePacket {
    pub player_id: PlayerId,
}

impl Encode for LeftGamePacket {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
    }
}

impl Decode for LeftGamePacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(LeftGamePacket {
            player_id: PlayerId::decode(r)?,
        })
    }
}

/// Health change applied to a player. Outbound only in this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpDeltaPacket {
    pub player_id: PlayerId,
    pub delta: i16,
}

impl Encode for HpDeltaPacket {
    fn encode(&self, w: &mut WireWriter) {
        self.player_id.encode(w);
        w.put_i16(self.delta);
    }
}

impl Decode for HpDeltaPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(HpDeltaPacket {
            player_id: PlayerId::decode(r)?,
            delta: r.get_i16()?,
        })
    }
}

/// Server-driven rich presence strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscordActivityPacket {
    pub state: String,
    pub details: String,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

impl Encode for DiscordActivityPacket {
    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.state);
        w.put_str(&self.details);
        w.put_str(&self.large_image_key);
        w.put_str(&self.large_image_text);
        w.put_str(&self.small_image_key);
        w.put_str(&self.small_image_text);
    }
}

impl Decode for DiscordActivityPacket {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(DiscordActivityPacket {
            state: r.get_str()?,
            details: r.get_str()?,
            large_image_key: r.get_str()?,
            large_image_text: r.get_str()?,
            small_image_key: r.get_str()?,
            small_image_text: r.get_str()?,
        })
    }
}
