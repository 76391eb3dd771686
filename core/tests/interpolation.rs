use lockstep_core::{
    config::SessionConfig,
    history::History,
    interpolate::{AxisMode, BodyView, Interpolator},
    peer::PeerRoster,
    rng::SequenceCursor,
    simulation::Simulation,
    state::{CommandSlots, SimulationState},
    types::{CommandValue, PeerIndex, Vec2},
};

/// Bodies are the payload; nothing moves on its own.
struct Pinned;

impl Simulation for Pinned {
    type Payload = Vec<BodyView>;

    fn name(&self) -> &'static str { "pinned" }

    fn create_initial(&mut self, _roster: &PeerRoster, _rng: &mut SequenceCursor<'_>) -> Self::Payload {
        Vec::new()
    }

    fn apply_command(&self, _: &mut Self::Payload, _: PeerIndex, _: CommandValue, _: &mut SequenceCursor<'_>) {}

    fn step_fixed(&self, _: &mut Self::Payload, _: f64, _: &mut SequenceCursor<'_>) {}

    fn bodies(&self, world: &Self::Payload) -> Vec<BodyView> {
        world.clone()
    }

    fn read_command(&mut self) -> CommandValue { 0 }
}

fn body(x: f64, vx: f64, y: f64, vy: f64) -> BodyView {
    BodyView {
        position:    Vec2::new(x, y),
        velocity:    Vec2::new(vx, vy),
        interpolate: true,
        enabled:     true,
    }
}

fn two_snapshots(first: Vec<BodyView>, second: Vec<BodyView>) -> History<Vec<BodyView>> {
    let state = |tick: u64, payload: Vec<BodyView>| SimulationState {
        tick,
        simulated_time: tick as f64 * 100.0,
        payload,
        commands: CommandSlots::empty(1),
        sequence_cursor: 0,
    };
    let mut history = History::new(state(0, first), 10).expect("history");
    history.push(state(1, second)).expect("push");
    history
}

fn interpolator(enabled: bool) -> Interpolator {
    Interpolator::new(&SessionConfig { interpolate: enabled, ..SessionConfig::default_test() })
}

#[test]
fn same_direction_is_a_straight_lerp() {
    let (x, mode) = interpolator(true).axis(25.0, 0.0, 10.0, 50.0, 100.0, 15.0, 50.0);
    assert_eq!(mode, AxisMode::Linear);
    assert!((x - 11.25).abs() < 1e-9);
}

#[test]
fn bounce_extrapolates_from_the_nearer_snapshot() {
    let interp = interpolator(true);

    // Closer to the first snapshot: carry on with its velocity.
    let (x, mode) = interp.axis(20.0, 0.0, 50.0, 50.0, 100.0, 60.0, -50.0);
    assert_eq!(mode, AxisMode::Extrapolated);
    assert!((x - 51.0).abs() < 1e-9);

    // Closer to the second: back off from it along its velocity.
    let (x, mode) = interp.axis(80.0, 0.0, 50.0, 50.0, 100.0, 60.0, -50.0);
    assert_eq!(mode, AxisMode::Extrapolated);
    assert!((x - 61.0).abs() < 1e-9);
}

#[test]
fn coming_to_rest_counts_as_a_direction_change() {
    let (_, mode) = interpolator(true).axis(50.0, 0.0, 0.0, 10.0, 100.0, 1.0, 0.0);
    assert_eq!(mode, AxisMode::Extrapolated);
}

#[test]
fn axes_are_handled_independently() {
    let history = two_snapshots(vec![body(50.0, 50.0, 300.0, 0.0)], vec![body(60.0, -50.0, 300.0, 0.0)]);
    // virtual now = 220 - 2 * 100 = 20
    let shown = interpolator(true).display(&Pinned, &history, 0, 220.0);

    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].x_mode, AxisMode::Extrapolated);
    assert_eq!(shown[0].y_mode, AxisMode::Linear);
    assert!((shown[0].position.x - 51.0).abs() < 1e-9);
    assert!((shown[0].position.y - 300.0).abs() < 1e-9);
}

#[test]
fn disabled_and_fixed_bodies_are_not_smoothed() {
    let mut fixed = body(5.0, 1.0, 5.0, 1.0);
    fixed.interpolate = false;
    let mut hidden = body(0.0, 0.0, 0.0, 0.0);
    hidden.enabled = false;
    let moving = body(0.0, 10.0, 0.0, 10.0);

    let history = two_snapshots(
        vec![fixed, hidden, moving],
        vec![fixed, hidden, body(1.0, 10.0, 1.0, 10.0)],
    );
    let shown = interpolator(true).display(&Pinned, &history, 0, 250.0);

    assert_eq!(shown.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(shown[0].x_mode, AxisMode::Snapshot);
    assert_eq!(shown[0].position, Vec2::new(5.0, 5.0));
    assert_eq!(shown[1].x_mode, AxisMode::Linear);
    assert!((shown[1].position.x - 0.5).abs() < 1e-9);
}

#[test]
fn no_successor_or_switched_off_shows_the_snapshot() {
    let history = two_snapshots(vec![body(1.0, 1.0, 1.0, 1.0)], vec![body(2.0, 1.0, 2.0, 1.0)]);

    let last = interpolator(true).display(&Pinned, &history, 1, 400.0);
    assert_eq!(last[0].x_mode, AxisMode::Snapshot);
    assert_eq!(last[0].position, Vec2::new(2.0, 2.0));

    let off = interpolator(false).display(&Pinned, &history, 0, 250.0);
    assert_eq!(off[0].y_mode, AxisMode::Snapshot);
    assert_eq!(off[0].position, Vec2::new(1.0, 1.0));

    assert!(interpolator(true).display(&Pinned, &history, 5, 250.0).is_empty());
}
