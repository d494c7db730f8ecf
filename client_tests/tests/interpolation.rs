//! Interpolation behavior driven through the public client API: position
//! packets in, smoothed per-tick motion out.

use std::time::Duration;

use client_shared::math::Vec3;
use client_shared::packets::PlayerId;
use client_tests::{connected_client, join, position_update};

const TICK: Duration = Duration::from_millis(100);

#[test]
fn remote_player_converges_onto_the_sample() {
    let (mut client, endpoint, _observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    endpoint.push(position_update(2, Vec3::new(50.0, 0.0, 0.0)));
    client.pulse();

    let mut previous_remaining = 50.0;
    let mut ticks = 0;
    loop {
        client.advance(TICK);
        ticks += 1;
        assert!(ticks < 50, "interpolation must converge in bounded ticks");

        let record = client.players().get_player(PlayerId(2)).unwrap();
        assert!(record.position.x <= 50.0, "never overshoots the target");
        assert!(record.position.y == 0.0 && record.position.z == 0.0);

        let remaining = 50.0 - record.position.x;
        assert!(remaining < previous_remaining, "remaining must shrink");
        previous_remaining = remaining;

        if !record.interp.is_interpolating() {
            assert_eq!(record.position, Vec3::new(50.0, 0.0, 0.0));
            break;
        }
    }
}

#[test]
fn teleport_snaps_in_a_single_tick() {
    let (mut client, endpoint, _observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    endpoint.push(position_update(2, Vec3::new(500.0, 0.0, 500.0)));
    client.pulse();

    client.advance(TICK);

    let record = client.players().get_player(PlayerId(2)).unwrap();
    assert_eq!(record.position, Vec3::new(500.0, 0.0, 500.0));
    assert!(!record.interp.is_interpolating());
}

#[test]
fn newer_sample_retargets_instead_of_replaying() {
    let (mut client, endpoint, _observer) = connected_client();
    endpoint.push(join(2, "Diego", Vec3::ZERO));
    endpoint.push(position_update(2, Vec3::new(40.0, 0.0, 0.0)));
    client.pulse();

    client.advance(TICK);

    // A later sample arrives while still in flight; motion bends toward it
    // rather than finishing the stale path first.
    endpoint.push(position_update(2, Vec3::new(40.0, 0.0, 40.0)));
    client.pulse();

    for _ in 0..50 {
        client.advance(TICK);
        if !client
            .players()
            .get_player(PlayerId(2))
            .unwrap()
            .interp
            .is_interpolating()
        {
            break;
        }
    }

    let record = client.players().get_player(PlayerId(2)).unwrap();
    assert_eq!(record.position, Vec3::new(40.0, 0.0, 40.0));
}

#[test]
fn local_player_position_is_never_interpolated() {
    let (mut client, endpoint, _observer) = connected_client();
    endpoint.push(client_tests::initial_info(1, "NEWWORLD.ZEN"));
    endpoint.push(position_update(1, Vec3::new(30.0, 0.0, 0.0)));
    client.pulse();

    // The local player's position is applied directly on receipt.
    assert_eq!(
        client.local_player().unwrap().position,
        Vec3::new(30.0, 0.0, 0.0)
    );

    client.advance(TICK);
    assert_eq!(
        client.local_player().unwrap().position,
        Vec3::new(30.0, 0.0, 0.0)
    );
}
