//! Shared support for the integration tests: a recording observer and
//! builders for the server-side packets the tests feed into the loopback
//! endpoint.

use std::cell::RefCell;
use std::rc::Rc;

use client_net::events::GameEventObserver;
use client_net::players::PlayerRecord;
use client_net::transport::loopback::{LoopbackEndpoint, LoopbackTransport};
use client_net::GameClient;
use client_shared::config::ClientConfig;
use client_shared::math::Vec3;
use client_shared::packets::{
    encode_packet, DiscordActivityPacket, InitialInfoPacket, JoinGamePacket, LeftGamePacket,
    MessagePacket, PacketTag, PlayerId, PlayerPositionUpdatePacket, PlayerStateUpdatePacket,
};
use client_shared::state::{GameFlags, PlayerAppearance, PlayerState};

/// Everything the presentation layer saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MapChange(String),
    LocalJoined(PlayerId),
    Joined(PlayerId, String),
    Left(PlayerId, String),
    PositionUpdate(PlayerId, Vec3),
    StateUpdate(PlayerId),
    Died(PlayerId),
    Respawned(PlayerId),
    SpellCast(PlayerId, u16),
    SpellCastOnTarget(PlayerId, PlayerId, u16),
    ItemDropped(PlayerId, u16, u16),
    ItemTaken(PlayerId, u16),
    Whisper(PlayerId, String, String),
    Chat(PlayerId, String, String),
    ServerMessage(String),
    RconResponse(String, bool),
    GameInfo(u32, GameFlags),
    DiscordActivity(String),
    ConnectionLost,
    Disconnected,
}

/// Observer recording every notification into a shared log.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    log: Rc<RefCell<Vec<Event>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.log.borrow().iter().filter(|e| matches(e)).count()
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl GameEventObserver for RecordingObserver {
    fn on_map_change(&mut self, map_name: &str) {
        self.push(Event::MapChange(map_name.to_string()));
    }

    fn on_local_player_joined(&mut self, player: &PlayerRecord) {
        self.push(Event::LocalJoined(player.id));
    }

    fn on_player_joined(&mut self, player: &PlayerRecord) {
        self.push(Event::Joined(player.id, player.name.clone()));
    }

    fn on_player_left(&mut self, id: PlayerId, name: &str) {
        self.push(Event::Left(id, name.to_string()));
    }

    fn on_player_position_update(&mut self, id: PlayerId, position: Vec3) {
        self.push(Event::PositionUpdate(id, position));
    }

    fn on_player_state_update(&mut self, id: PlayerId, _state: &PlayerState) {
        self.push(Event::StateUpdate(id));
    }

    fn on_player_died(&mut self, id: PlayerId) {
        self.push(Event::Died(id));
    }

    fn on_player_respawned(&mut self, id: PlayerId) {
        self.push(Event::Respawned(id));
    }

    fn on_spell_cast(&mut self, caster: PlayerId, spell_id: u16) {
        self.push(Event::SpellCast(caster, spell_id));
    }

    fn on_spell_cast_on_target(&mut self, caster: PlayerId, target: PlayerId, spell_id: u16) {
        self.push(Event::SpellCastOnTarget(caster, target, spell_id));
    }

    fn on_item_dropped(&mut self, id: PlayerId, item_instance: u16, amount: u16) {
        self.push(Event::ItemDropped(id, item_instance, amount));
    }

    fn on_item_taken(&mut self, id: PlayerId, item_instance: u16) {
        self.push(Event::ItemTaken(id, item_instance));
    }

    fn on_whisper(&mut self, sender: PlayerId, sender_name: &str, message: &str) {
        self.push(Event::Whisper(
            sender,
            sender_name.to_string(),
            message.to_string(),
        ));
    }

    fn on_chat_message(&mut self, sender: PlayerId, sender_name: &str, message: &str) {
        self.push(Event::Chat(
            sender,
            sender_name.to_string(),
            message.to_string(),
        ));
    }

    fn on_server_message(&mut self, message: &str) {
        self.push(Event::ServerMessage(message.to_string()));
    }

    fn on_rcon_response(&mut self, message: &str, is_admin: bool) {
        self.push(Event::RconResponse(message.to_string(), is_admin));
    }

    fn on_game_info(&mut self, raw_game_time: u32, flags: GameFlags) {
        self.push(Event::GameInfo(raw_game_time, flags));
    }

    fn on_discord_activity(&mut self, activity: &DiscordActivityPacket) {
        self.push(Event::DiscordActivity(activity.state.clone()));
    }

    fn on_connection_lost(&mut self) {
        self.push(Event::ConnectionLost);
    }

    fn on_disconnected(&mut self) {
        self.push(Event::Disconnected);
    }
}

/// Connected client over a loopback pair, plus the server-side handle and the
/// recorded event log.
pub fn connected_client() -> (GameClient, LoopbackEndpoint, RecordingObserver) {
    let (transport, endpoint) = LoopbackTransport::pair();
    let observer = RecordingObserver::default();
    let mut client = GameClient::new(
        Box::new(transport),
        Box::new(observer.clone()),
        ClientConfig::default(),
    );
    assert!(client.connect("localhost"));
    (client, endpoint, observer)
}

pub fn initial_info(id: u64, map: &str) -> Vec<u8> {
    encode_packet(
        PacketTag::InitialInfo,
        &InitialInfoPacket {
            player_id: PlayerId(id),
            map_name: map.to_string(),
        },
    )
    .to_vec()
}

pub fn join(id: u64, name: &str, position: Vec3) -> Vec<u8> {
    encode_packet(
        PacketTag::JoinGame,
        &JoinGamePacket {
            player_id: Some(PlayerId(id)),
            player_name: name.to_string(),
            position,
            left_hand_item: 0,
            right_hand_item: 0,
            equipped_armor: 0,
            appearance: PlayerAppearance::default(),
        },
    )
    .to_vec()
}

pub fn position_update(id: u64, position: Vec3) -> Vec<u8> {
    encode_packet(
        PacketTag::MapOnly,
        &PlayerPositionUpdatePacket {
            player_id: Some(PlayerId(id)),
            position,
        },
    )
    .to_vec()
}

pub fn state_update(id: u64, state: PlayerState) -> Vec<u8> {
    encode_packet(
        PacketTag::ActualStatistics,
        &PlayerStateUpdatePacket {
            player_id: Some(PlayerId(id)),
            state,
        },
    )
    .to_vec()
}

pub fn chat(sender: u64, message: &str) -> Vec<u8> {
    encode_packet(
        PacketTag::Message,
        &MessagePacket {
            sender: Some(PlayerId(sender)),
            recipient: None,
            message: message.to_string(),
        },
    )
    .to_vec()
}

pub fn left_game(id: u64) -> Vec<u8> {
    encode_packet(
        PacketTag::LeftGame,
        &LeftGamePacket {
            player_id: PlayerId(id),
        },
    )
    .to_vec()
}
