//! Full packet-flow integration tests: a scripted server on the loopback
//! endpoint drives the client through a session.

use client_shared::math::Vec3;
use client_shared::packets::{
    encode_packet, encode_tag_only, CastSpellPacket, DiscordActivityPacket, DropItemPacket,
    ExistingPlayerEntry, ExistingPlayersPacket, GameInfoPacket, MessagePacket, PacketTag,
    PlayerDeathPacket, PlayerId, PlayerRespawnPacket, RconResponsePacket, TakeItemPacket,
};
use client_shared::state::{GameFlags, PlayerAppearance, PlayerState};
use client_tests::{
    chat, connected_client, initial_info, join, left_game, state_update, Event,
};

#[test]
fn session_join_flow() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let (mut client, endpoint, observer) = connected_client();

    endpoint.push(initial_info(1, "NEWWORLD.ZEN"));
    endpoint.push(
        encode_packet(
            PacketTag::ExistingPlayers,
            &ExistingPlayersPacket {
                players: vec![
                    ExistingPlayerEntry {
                        player_id: PlayerId(2),
                        name: "Diego".to_string(),
                        position: Vec3::new(100.0, 0.0, 50.0),
                        left_hand_item: 0,
                        right_hand_item: 5001,
                        equipped_armor: 3100,
                        appearance: PlayerAppearance::default(),
                    },
                    ExistingPlayerEntry {
                        player_id: PlayerId(3),
                        name: "Gorn".to_string(),
                        position: Vec3::new(-20.0, 4.0, 9.0),
                        left_hand_item: 0,
                        right_hand_item: 0,
                        equipped_armor: 0,
                        appearance: PlayerAppearance::default(),
                    },
                ],
            },
        )
        .to_vec(),
    );
    endpoint.push(join(4, "Lester", Vec3::new(5.0, 0.0, 5.0)));
    client.pulse();

    assert!(client.is_in_game());
    assert_eq!(client.current_map(), Some("NEWWORLD.ZEN"));
    assert_eq!(client.players().len(), 4);
    assert_eq!(client.local_player().unwrap().id, PlayerId(1));

    let diego = client.players().get_player(PlayerId(2)).unwrap();
    assert_eq!(diego.name, "Diego");
    assert_eq!(diego.right_hand_item, 5001);
    assert_eq!(diego.position, Vec3::new(100.0, 0.0, 50.0));

    assert_eq!(
        observer.events(),
        vec![
            Event::MapChange("NEWWORLD.ZEN".to_string()),
            Event::LocalJoined(PlayerId(1)),
            Event::Joined(PlayerId(2), "Diego".to_string()),
            Event::Joined(PlayerId(3), "Gorn".to_string()),
            Event::Joined(PlayerId(4), "Lester".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn gameplay_packets_notify_with_applied_data() {
    let (mut client, endpoint, observer) = connected_client();
    endpoint.push(initial_info(1, "NEWWORLD.ZEN"));
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    client.pulse();
    observer.clear();

    endpoint.push(
        encode_packet(
            PacketTag::DoDie,
            &PlayerDeathPacket {
                player_id: PlayerId(2),
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::Respawn,
            &PlayerRespawnPacket {
                player_id: PlayerId(2),
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::CastSpell,
            &CastSpellPacket {
                caster_id: Some(PlayerId(2)),
                target_id: None,
                spell_id: 12,
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::CastSpellOnTarget,
            &CastSpellPacket {
                caster_id: Some(PlayerId(2)),
                target_id: Some(PlayerId(1)),
                spell_id: 7,
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::DropItem,
            &DropItemPacket {
                player_id: Some(PlayerId(2)),
                item_instance: 900,
                item_amount: 3,
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::TakeItem,
            &TakeItemPacket {
                player_id: Some(PlayerId(2)),
                item_instance: 900,
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::GameInfo,
            &GameInfoPacket {
                raw_game_time: 86_400,
                flags: GameFlags::HIDE_MAP,
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::DiscordActivity,
            &DiscordActivityPacket {
                state: "In Khorinis".to_string(),
                ..Default::default()
            },
        )
        .to_vec(),
    );
    endpoint.push(
        encode_packet(
            PacketTag::RconCommand,
            &RconResponsePacket {
                is_admin: true,
                message: "players: 2".to_string(),
            },
        )
        .to_vec(),
    );
    client.pulse();

    assert_eq!(
        observer.events(),
        vec![
            Event::Died(PlayerId(2)),
            Event::Respawned(PlayerId(2)),
            Event::SpellCast(PlayerId(2), 12),
            Event::SpellCastOnTarget(PlayerId(2), PlayerId(1), 7),
            Event::ItemDropped(PlayerId(2), 900, 3),
            Event::ItemTaken(PlayerId(2), 900),
            Event::GameInfo(86_400, GameFlags::HIDE_MAP),
            Event::DiscordActivity("In Khorinis".to_string()),
            Event::RconResponse("players: 2".to_string(), true),
        ]
    );
}

#[test]
fn chat_and_whisper_resolve_sender_names() {
    let (mut client, endpoint, observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    endpoint.push(chat(2, "hello"));
    endpoint.push(
        encode_packet(
            PacketTag::Whisper,
            &MessagePacket {
                sender: Some(PlayerId(9)), // unknown player
                recipient: Some(PlayerId(1)),
                message: "psst".to_string(),
            },
        )
        .to_vec(),
    );
    client.pulse();

    let events = observer.events();
    assert!(events.contains(&Event::Chat(PlayerId(2), "Diego".to_string(), "hello".to_string())));
    // Unknown senders resolve to an empty name, not an error.
    assert!(events.contains(&Event::Whisper(PlayerId(9), String::new(), "psst".to_string())));
}

#[test]
fn state_update_applies_fields_and_notifies() {
    let (mut client, endpoint, observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    client.pulse();
    observer.clear();

    let state = PlayerState {
        health: 120,
        mana: 35,
        animation: 11,
        active_spell: 4,
        ..Default::default()
    };
    endpoint.push(state_update(2, state));
    client.pulse();

    let diego = client.players().get_player(PlayerId(2)).unwrap();
    assert_eq!(diego.health, 120);
    assert_eq!(diego.mana, 35);
    assert_eq!(diego.animation, 11);
    assert_eq!(diego.active_spell, 4);
    assert_eq!(observer.events(), vec![Event::StateUpdate(PlayerId(2))]);
}

#[test]
fn left_game_removes_record_and_interp_state() {
    let (mut client, endpoint, observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    client.pulse();
    observer.clear();

    endpoint.push(left_game(2));
    client.pulse();

    assert!(client.players().get_player(PlayerId(2)).is_none());
    assert_eq!(
        observer.events(),
        vec![Event::Left(PlayerId(2), "Diego".to_string())]
    );
}

#[test]
fn unknown_and_malformed_packets_are_absorbed() {
    let (mut client, endpoint, observer) = connected_client();

    endpoint.push(vec![199, 1, 2, 3]); // unregistered tag
    endpoint.push(vec![PacketTag::JoinGame as u8, 0xFF]); // truncated body
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    client.pulse();

    // The session survives and the valid packet still lands.
    assert!(client.is_connected());
    assert_eq!(
        observer.events(),
        vec![Event::Joined(PlayerId(2), "Diego".to_string())]
    );
}

#[test]
fn validation_failure_skips_mutation_and_notification() {
    let (mut client, endpoint, observer) = connected_client();

    endpoint.push(
        encode_packet(
            PacketTag::CastSpell,
            &CastSpellPacket {
                caster_id: None,
                target_id: None,
                spell_id: 3,
            },
        )
        .to_vec(),
    );
    client.pulse();

    assert!(observer.events().is_empty());
    assert_eq!(client.players().len(), 0);
}

#[test]
fn connection_loss_notifies_once_and_clears_the_mirror() {
    let (mut client, endpoint, observer) = connected_client();
    endpoint.push(initial_info(1, "NEWWORLD.ZEN"));
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    client.pulse();

    endpoint.push(encode_tag_only(PacketTag::DisconnectNotification).to_vec());
    endpoint.drop_connection();
    client.pulse();
    client.pulse();

    assert!(!client.is_connected());
    assert!(!client.is_in_game());
    assert_eq!(client.players().len(), 0);
    assert_eq!(observer.count(|e| *e == Event::ConnectionLost), 1);
}
