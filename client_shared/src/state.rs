//! Replicated player state.
//!
//! `PlayerState` is the full per-player snapshot carried by the statistics
//! update packet; `PlayerAppearance` is the immutable-ish character setup sent
//! once on join. Both encode with the fixed field order the server expects.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::math::Vec3;
use crate::wire::{Decode, Encode, WireReader, WireWriter};

/// Weapon stance of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum WeaponMode {
    #[default]
    None = 0,
    Fist = 1,
    OneHanded = 2,
    TwoHanded = 3,
    Bow = 4,
    Crossbow = 5,
    Magic = 6,
}

impl WeaponMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(WeaponMode::None),
            1 => Some(WeaponMode::Fist),
            2 => Some(WeaponMode::OneHanded),
            3 => Some(WeaponMode::TwoHanded),
            4 => Some(WeaponMode::Bow),
            5 => Some(WeaponMode::Crossbow),
            6 => Some(WeaponMode::Magic),
            _ => None,
        }
    }
}

impl Encode for WeaponMode {
    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(*self as u8);
    }
}

impl Decode for WeaponMode {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let v = r.get_u8()?;
        WeaponMode::from_u8(v).ok_or(WireError::BadEnumValue {
            what: "weapon mode",
            value: v,
        })
    }
}

bitflags! {
    /// Server-side world options carried by the game-info packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GameFlags: u8 {
        /// Player map overlay is disabled on this server.
        const HIDE_MAP = 0b0000_0001;
        /// Potions apply instantly instead of playing the drink animation.
        const QUICK_POTS = 0b0000_0010;
        /// Dropping items into the world is allowed.
        const DROP_ITEMS = 0b0000_0100;
    }
}

impl Encode for GameFlags {
    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.bits());
    }
}

impl Decode for GameFlags {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        // Unknown bits are preserved so newer servers stay decodable.
        Ok(GameFlags::from_bits_retain(r.get_u8()?))
    }
}

/// Full replicated state of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerState {
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
}

impl Encode for PlayerState {
    fn encode(&self, w: &mut WireWriter) {
        w.put_vec3(self.position);
        w.put_vec3(self.rotation);
        w.put_f32(self.head_direction);
        w.put_u16(self.left_hand_item);
        w.put_u16(self.right_hand_item);
        w.put_u16(self.equipped_armor);
        w.put_i16(self.health);
        w.put_i16(self.mana);
        w.put_u16(self.animation);
        self.weapon_mode.encode(w);
        w.put_u16(self.active_spell);
        w.put_u16(self.melee_weapon);
        w.put_u16(self.ranged_weapon);
    }
}

impl Decode for PlayerState {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerState {
            position: r.get_vec3()?,
            rotation: r.get_vec3()?,
            head_direction: r.get_f32()?,
            left_hand_item: r.get_u16()?,
            right_hand_item: r.get_u16()?,
            equipped_armor: r.get_u16()?,
            health: r.get_i16()?,
            mana: r.get_i16()?,
            animation: r.get_u16()?,
            weapon_mode: WeaponMode::decode(r)?,
            active_spell: r.get_u16()?,
            melee_weapon: r.get_u16()?,
            ranged_weapon: r.get_u16()?,
        })
    }
}

/// Character setup chosen before joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlayerAppearance {
    pub selected_class: u8,
    pub head_model: i32,
    pub skin_texture: i32,
    pub face_texture: i32,
    pub walk_style: i32,
}

impl Encode for PlayerAppearance {
    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.selected_class);
        w.put_i32(self.head_model);
        w.put_i32(self.skin_texture);
        w.put_i32(self.face_texture);
        w.put_i32(self.walk_style);
    }
}

impl Decode for PlayerAppearance {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(PlayerAppearance {
            selected_class: r.get_u8()?,
            head_model: r.get_i32()?,
            skin_texture: r.get_i32()?,
            face_texture: r.get_i32()?,
            walk_style: r.get_i32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{decode_from_bytes, encode_to_bytes};

    #[test]
    fn player_state_roundtrip() {
        let state = PlayerState {
            position: Vec3::new(120.5, -3.0, 44.0),
            rotation: Vec3::new(0.0, 180.0, 0.0),
            head_direction: 12.5,
            left_hand_item: 7,
            right_hand_item: 8,
            equipped_armor: 3000,
            health: 250,
            mana: 40,
            animation: 11,
            weapon_mode: WeaponMode::OneHanded,
            active_spell: 0,
            melee_weapon: 5001,
            ranged_weapon: 0,
        };
        let bytes = encode_to_bytes(&state);
        assert_eq!(decode_from_bytes::<PlayerState>(&bytes).unwrap(), state);
    }

    #[test]
    fn bad_weapon_mode_is_a_decode_error() {
        let mut w = WireWriter::new();
        PlayerState::default().encode(&mut w);
        let mut bytes = w.freeze().to_vec();
        // The weapon mode byte sits after 7 floats, 3 item ids, hp/mana,
        // and the animation id.
        let offset = 7 * 4 + 3 * 2 + 2 * 2 + 2;
        bytes[offset] = 99;
        assert_eq!(
            decode_from_bytes::<PlayerState>(&bytes),
            Err(WireError::BadEnumValue {
                what: "weapon mode",
                value: 99
            })
        );
    }

    #[test]
    fn game_flags_preserve_unknown_bits() {
        let bytes = [0b1010_0001u8];
        let flags = decode_from_bytes::<GameFlags>(&bytes).unwrap();
        assert!(flags.contains(GameFlags::HIDE_MAP));
        assert_eq!(encode_to_bytes(&flags)[..], bytes[..]);
    }
}
