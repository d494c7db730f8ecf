//! Game session: the glue between transport, dispatcher, player mirror, and
//! the presentation layer.
//!
//! Inbound, every packet kind follows the same recipe: decode, validate the
//! required identifiers, resolve or create the player record, apply the
//! mutations, notify the observer. Validation failures drop the packet with
//! one log entry and touch nothing.
//!
//! Outbound, each public send operation builds its packet and ships it with a
//! fixed (priority, reliability) pair chosen per action.

use std::time::Duration;

use client_shared::config::ClientConfig;
use client_shared::error::NetError;
use client_shared::packets::{
    encode_packet, encode_tag_only, CastSpellPacket, DiscordActivityPacket, DropItemPacket,
    ExistingPlayersPacket, GameInfoPacket, HpDeltaPacket, InitialInfoPacket, JoinGamePacket,
    LeftGamePacket, MessagePacket, PacketTag, PlayerDeathPacket, PlayerId,
    PlayerPositionUpdatePacket, PlayerRespawnPacket, PlayerStateUpdatePacket, RconResponsePacket,
    TakeItemPacket,
};
use client_shared::state::PlayerState;
use client_shared::wire::decode_from_bytes;
use tracing::{debug, info, warn};

use crate::dispatch::{PacketDispatcher, PacketHandler};
use crate::events::GameEventObserver;
use crate::interp::AnimationCatalog;
use crate::players::{PlayerManager, PlayerRecord};
use crate::transport::{PacketSink, Priority, Reliability, Transport};

/// Port assumed when the server address omits one.
pub const DEFAULT_PORT: u16 = 57005;

/// Longest chat/whisper/command text shipped to the server.
pub const MAX_MESSAGE_LENGTH: usize = 256;

/// Mutable session state threaded through every packet handler. Owned by the
/// [`GameClient`]; handlers receive it by reference, never through globals.
pub struct SessionContext {
    pub players: PlayerManager,
    pub animations: AnimationCatalog,
    pub current_map: Option<String>,
    pub is_in_game: bool,
    pub connection_lost: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            players: PlayerManager::new(),
            animations: AnimationCatalog::standard(),
            current_map: None,
            is_in_game: false,
            connection_lost: false,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inbound packet handlers ───

struct InitialInfoHandler;

impl PacketHandler for InitialInfoHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<InitialInfoPacket>(payload)?;

        info!(player_id = %packet.player_id, map = %packet.map_name, "entered game");

        ctx.players.create_local_player(packet.player_id);
        ctx.current_map = Some(packet.map_name.clone());
        ctx.is_in_game = true;

        observer.on_map_change(&packet.map_name);
        if let Some(record) = ctx.players.get_player(packet.player_id) {
            observer.on_local_player_joined(record);
        }
        Ok(())
    }
}

struct ActualStatisticsHandler;

impl PacketHandler for ActualStatisticsHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<PlayerStateUpdatePacket>(payload)?;
        let id = packet
            .player_id
            .ok_or(NetError::ProtocolViolation("state update without player id"))?;

        let SessionContext {
            players,
            animations,
            ..
        } = ctx;
        if let Some(record) = players.get_player_mut(id) {
            record.apply_animation(packet.state.animation, animations);
            record.apply_state(&packet.state);
            if record.is_local {
                record.position = packet.state.position;
            } else {
                record.interp.update_target(packet.state.position);
            }
        }

        observer.on_player_state_update(id, &packet.state);
        Ok(())
    }
}

struct MapOnlyHandler;

impl PacketHandler for MapOnlyHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<PlayerPositionUpdatePacket>(payload)?;
        let id = packet
            .player_id
            .ok_or(NetError::ProtocolViolation("position update without player id"))?;

        if let Some(record) = ctx.players.get_player_mut(id) {
            if record.is_local {
                record.position = packet.position;
            } else {
                record.interp.update_target(packet.position);
            }
        }

        observer.on_player_position_update(id, packet.position);
        Ok(())
    }
}

struct DoDieHandler;

impl PacketHandler for DoDieHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<PlayerDeathPacket>(payload)?;
        observer.on_player_died(packet.player_id);
        Ok(())
    }
}

struct RespawnHandler;

impl PacketHandler for RespawnHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<PlayerRespawnPacket>(payload)?;
        observer.on_player_respawned(packet.player_id);
        Ok(())
    }
}

struct CastSpellHandler;

impl PacketHandler for CastSpellHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<CastSpellPacket>(payload)?;
        let caster = packet
            .caster_id
            .ok_or(NetError::ProtocolViolation("spell cast without caster id"))?;
        observer.on_spell_cast(caster, packet.spell_id);
        Ok(())
    }
}

struct CastSpellOnTargetHandler;

impl PacketHandler for CastSpellOnTargetHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<CastSpellPacket>(payload)?;
        let caster = packet
            .caster_id
            .ok_or(NetError::ProtocolViolation("targeted spell without caster id"))?;
        let target = packet
            .target_id
            .ok_or(NetError::ProtocolViolation("targeted spell without target id"))?;
        observer.on_spell_cast_on_target(caster, target, packet.spell_id);
        Ok(())
    }
}

struct DropItemHandler;

impl PacketHandler for DropItemHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<DropItemPacket>(payload)?;
        let id = packet
            .player_id
            .ok_or(NetError::ProtocolViolation("drop item without player id"))?;
        observer.on_item_dropped(id, packet.item_instance, packet.item_amount);
        Ok(())
    }
}

struct TakeItemHandler;

impl PacketHandler for TakeItemHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<TakeItemPacket>(payload)?;
        let id = packet
            .player_id
            .ok_or(NetError::ProtocolViolation("take item without player id"))?;
        observer.on_item_taken(id, packet.item_instance);
        Ok(())
    }
}

struct WhisperHandler;

impl PacketHandler for WhisperHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<MessagePacket>(payload)?;
        let sender = packet
            .sender
            .ok_or(NetError::ProtocolViolation("whisper without sender id"))?;
        let name = ctx.players.player_name(sender);
        observer.on_whisper(sender, &name, &packet.message);
        Ok(())
    }
}

struct MessageHandler;

impl PacketHandler for MessageHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<MessagePacket>(payload)?;
        let sender = packet
            .sender
            .ok_or(NetError::ProtocolViolation("chat message without sender id"))?;
        let name = ctx.players.player_name(sender);
        info!(sender = %sender, name = %name, message = %packet.message, "chat message");
        observer.on_chat_message(sender, &name, &packet.message);
        Ok(())
    }
}

struct ServerMessageHandler;

impl PacketHandler for ServerMessageHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<MessagePacket>(payload)?;
        observer.on_server_message(&packet.message);
        Ok(())
    }
}

struct RconHandler;

impl PacketHandler for RconHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<RconResponsePacket>(payload)?;
        observer.on_rcon_response(&packet.message, packet.is_admin);
        Ok(())
    }
}

struct ExistingPlayersHandler;

impl PacketHandler for ExistingPlayersHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<ExistingPlayersPacket>(payload)?;

        for entry in &packet.players {
            info!(player_id = %entry.player_id, name = %entry.name, "existing player");

            let record = ctx.players.create_player(entry.player_id);
            record.name = entry.name.clone();
            record.position = entry.position;
            record.left_hand_item = entry.left_hand_item;
            record.right_hand_item = entry.right_hand_item;
            record.equipped_armor = entry.equipped_armor;
            record.appearance = entry.appearance;

            observer.on_player_joined(record);
        }
        Ok(())
    }
}

struct JoinGameHandler;

impl PacketHandler for JoinGameHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<JoinGamePacket>(payload)?;
        let id = packet
            .player_id
            .ok_or(NetError::ProtocolViolation("join announcement without player id"))?;

        info!(player_id = %id, name = %packet.player_name, "player joined");

        let record = ctx.players.create_player(id);
        record.name = packet.player_name.clone();
        record.position = packet.position;
        record.left_hand_item = packet.left_hand_item;
        record.right_hand_item = packet.right_hand_item;
        record.equipped_armor = packet.equipped_armor;
        record.appearance = packet.appearance;

        observer.on_player_joined(record);
        Ok(())
    }
}

struct GameInfoHandler;

impl PacketHandler for GameInfoHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<GameInfoPacket>(payload)?;
        observer.on_game_info(packet.raw_game_time, packet.flags);
        Ok(())
    }
}

struct LeftGameHandler;

impl PacketHandler for LeftGameHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<LeftGamePacket>(payload)?;

        let name = ctx.players.player_name(packet.player_id);
        info!(player_id = %packet.player_id, name = %name, "player left");

        observer.on_player_left(packet.player_id, &name);
        ctx.players.remove_player(packet.player_id);
        Ok(())
    }
}

struct DiscordActivityHandler;

impl PacketHandler for DiscordActivityHandler {
    fn handle(
        &self,
        _ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let packet = decode_from_bytes::<DiscordActivityPacket>(payload)?;
        debug!(state = %packet.state, details = %packet.details, "discord activity");
        observer.on_discord_activity(&packet);
        Ok(())
    }
}

/// Handles both transport-synthesized envelopes: the orderly disconnect
/// notification and abrupt connection loss. Raised at most once per
/// established connection.
struct ConnectionLostHandler;

impl PacketHandler for ConnectionLostHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        _payload: &[u8],
    ) -> Result<(), NetError> {
        if !ctx.connection_lost {
            warn!("connection to server lost");
            ctx.connection_lost = true;
            ctx.is_in_game = false;
            ctx.current_map = None;
            ctx.players.clear();
            observer.on_connection_lost();
        }
        Ok(())
    }
}

/// Dispatcher plus everything it mutates; the piece of the client handed to
/// the transport as the packet sink.
struct SessionInner {
    dispatcher: PacketDispatcher,
    ctx: SessionContext,
    observer: Box<dyn GameEventObserver>,
}

impl PacketSink for SessionInner {
    fn handle_packet(&mut self, data: &[u8]) -> bool {
        // Everything delivered after the connection died is ignored.
        if self.ctx.connection_lost {
            return false;
        }
        self.dispatcher
            .handle(&mut self.ctx, self.observer.as_mut(), data)
    }
}

/// High-level game client: owns the transport, the dispatch table, the player
/// mirror, and the presentation observer.
pub struct GameClient {
    transport: Box<dyn Transport>,
    inner: SessionInner,
    config: ClientConfig,
}

impl GameClient {
    pub fn new(
        transport: Box<dyn Transport>,
        observer: Box<dyn GameEventObserver>,
        config: ClientConfig,
    ) -> Self {
        let mut dispatcher = PacketDispatcher::new();
        register_handlers(&mut dispatcher);

        Self {
            transport,
            inner: SessionInner {
                dispatcher,
                ctx: SessionContext::new(),
                observer,
            },
            config,
        }
    }

    /// Connects to `host[:port]`. Returns `false` on failure, leaving all
    /// state untouched.
    pub fn connect(&mut self, address: &str) -> bool {
        let (host, port) = parse_address(address);
        if !self.transport.connect(host, port) {
            warn!(host, port, "connect failed");
            return false;
        }
        info!(host, port, "connected");
        self.inner.ctx.connection_lost = false;
        true
    }

    /// Drops the connection immediately and clears every player record.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.inner.ctx.is_in_game = false;
        self.inner.ctx.current_map = None;
        self.inner.ctx.players.clear();
        self.transport.disconnect();
        info!("disconnected");
        self.inner.observer.on_disconnected();
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.ctx.connection_lost && self.transport.is_connected()
    }

    pub fn is_in_game(&self) -> bool {
        self.inner.ctx.is_in_game
    }

    pub fn current_map(&self) -> Option<&str> {
        self.inner.ctx.current_map.as_deref()
    }

    pub fn ping(&self) -> Duration {
        self.transport.ping()
    }

    pub fn players(&self) -> &PlayerManager {
        &self.inner.ctx.players
    }

    pub fn local_player(&self) -> Option<&PlayerRecord> {
        self.inner.ctx.players.local_player()
    }

    /// Animation-to-velocity table used by the interpolation engine.
    pub fn animations_mut(&mut self) -> &mut AnimationCatalog {
        &mut self.inner.ctx.animations
    }

    /// Runs one network step: flushes outbound messages and dispatches every
    /// inbound packet. Call once per tick; never blocks.
    pub fn pulse(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.transport.pulse(&mut self.inner);
    }

    /// Advances interpolation for every remote player. Call once per tick,
    /// independent of packet arrival.
    pub fn advance(&mut self, frame: Duration) {
        self.inner.ctx.players.step_interpolation(frame);
    }

    // ─── Send operations ───

    /// Requests to join the game with the configured name and appearance.
    pub fn join_game(&mut self) -> bool {
        let packet = JoinGamePacket {
            player_id: None,
            player_name: self.config.nickname.clone(),
            position: self
                .local_player()
                .map(|p| p.position)
                .unwrap_or_default(),
            left_hand_item: 0,
            right_hand_item: 0,
            equipped_armor: 0,
            appearance: self.config.appearance,
        };
        self.send(
            encode_packet(PacketTag::JoinGame, &packet),
            Reliability::ReliableOrdered,
            Priority::Immediate,
        )
    }

    pub fn send_chat_message(&mut self, message: &str) -> bool {
        let packet = MessagePacket {
            sender: None,
            recipient: None,
            message: truncate_message(message),
        };
        self.send(
            encode_packet(PacketTag::Message, &packet),
            Reliability::Reliable,
            Priority::Medium,
        )
    }

    pub fn send_whisper(&mut self, recipient: PlayerId, message: &str) -> bool {
        let packet = MessagePacket {
            sender: None,
            recipient: Some(recipient),
            message: truncate_message(message),
        };
        self.send(
            encode_packet(PacketTag::Whisper, &packet),
            Reliability::ReliableOrdered,
            Priority::High,
        )
    }

    pub fn send_command(&mut self, command: &str) -> bool {
        let packet = MessagePacket {
            sender: None,
            recipient: None,
            message: truncate_message(command),
        };
        self.send(
            encode_packet(PacketTag::RconCommand, &packet),
            Reliability::ReliableOrdered,
            Priority::High,
        )
    }

    /// Casts a spell, targeted when `target` is given.
    pub fn send_cast_spell(&mut self, target: Option<PlayerId>, spell_id: u16) -> bool {
        let tag = if target.is_some() {
            PacketTag::CastSpellOnTarget
        } else {
            PacketTag::CastSpell
        };
        let packet = CastSpellPacket {
            caster_id: None,
            target_id: target,
            spell_id,
        };
        self.send(
            encode_packet(tag, &packet),
            Reliability::Reliable,
            Priority::High,
        )
    }

    pub fn send_drop_item(&mut self, item_instance: u16, amount: u16) -> bool {
        let packet = DropItemPacket {
            player_id: None,
            item_instance,
            item_amount: amount,
        };
        self.send(
            encode_packet(PacketTag::DropItem, &packet),
            Reliability::Reliable,
            Priority::High,
        )
    }

    pub fn send_take_item(&mut self, item_instance: u16) -> bool {
        let packet = TakeItemPacket {
            player_id: None,
            item_instance,
        };
        self.send(
            encode_packet(PacketTag::TakeItem, &packet),
            Reliability::Reliable,
            Priority::High,
        )
    }

    /// Ships the local player's full state snapshot.
    pub fn send_player_state(&mut self, state: &PlayerState) -> bool {
        let packet = PlayerStateUpdatePacket {
            player_id: None,
            state: state.clone(),
        };
        self.send(
            encode_packet(PacketTag::ActualStatistics, &packet),
            Reliability::ReliableOrdered,
            Priority::Immediate,
        )
    }

    pub fn send_hp_delta(&mut self, player_id: PlayerId, delta: i16) -> bool {
        let packet = HpDeltaPacket { player_id, delta };
        self.send(
            encode_packet(PacketTag::HpDelta, &packet),
            Reliability::Reliable,
            Priority::Immediate,
        )
    }

    /// Asks the server for the current game time.
    pub fn sync_game_time(&mut self) -> bool {
        self.send(
            encode_tag_only(PacketTag::GameInfo),
            Reliability::Reliable,
            Priority::Immediate,
        )
    }

    fn send(&mut self, bytes: bytes::Bytes, reliability: Reliability, priority: Priority) -> bool {
        self.transport.send(&bytes, reliability, priority)
    }
}

fn register_handlers(dispatcher: &mut PacketDispatcher) {
    dispatcher.register(PacketTag::InitialInfo, Box::new(InitialInfoHandler));
    dispatcher.register(PacketTag::ActualStatistics, Box::new(ActualStatisticsHandler));
    dispatcher.register(PacketTag::MapOnly, Box::new(MapOnlyHandler));
    dispatcher.register(PacketTag::DoDie, Box::new(DoDieHandler));
    dispatcher.register(PacketTag::Respawn, Box::new(RespawnHandler));
    dispatcher.register(PacketTag::CastSpell, Box::new(CastSpellHandler));
    dispatcher.register(PacketTag::CastSpellOnTarget, Box::new(CastSpellOnTargetHandler));
    dispatcher.register(PacketTag::DropItem, Box::new(DropItemHandler));
    dispatcher.register(PacketTag::TakeItem, Box::new(TakeItemHandler));
    dispatcher.register(PacketTag::Whisper, Box::new(WhisperHandler));
    dispatcher.register(PacketTag::Message, Box::new(MessageHandler));
    dispatcher.register(PacketTag::ServerMessage, Box::new(ServerMessageHandler));
    dispatcher.register(PacketTag::RconCommand, Box::new(RconHandler));
    dispatcher.register(PacketTag::ExistingPlayers, Box::new(ExistingPlayersHandler));
    dispatcher.register(PacketTag::JoinGame, Box::new(JoinGameHandler));
    dispatcher.register(PacketTag::GameInfo, Box::new(GameInfoHandler));
    dispatcher.register(PacketTag::LeftGame, Box::new(LeftGameHandler));
    dispatcher.register(PacketTag::DiscordActivity, Box::new(DiscordActivityHandler));
    dispatcher.register(
        PacketTag::DisconnectNotification,
        Box::new(ConnectionLostHandler),
    );
    dispatcher.register(PacketTag::ConnectionLost, Box::new(ConnectionLostHandler));
}

/// Splits `host[:port]`, falling back to [`DEFAULT_PORT`].
fn parse_address(address: &str) -> (&str, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, port),
            Err(_) => (address, DEFAULT_PORT),
        },
        None => (address, DEFAULT_PORT),
    }
}

/// Caps a message at [`MAX_MESSAGE_LENGTH`] bytes on a character boundary.
fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MESSAGE_LENGTH {
        return message.to_string();
    }
    let mut len = MAX_MESSAGE_LENGTH;
    while !message.is_char_boundary(len) {
        len -= 1;
    }
    message[..len].to_string()
}
