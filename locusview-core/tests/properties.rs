use locusview_core::{
    EngineConfig, NullObserver, SequenceBounds, ViewCoordinator, ViewportId, ViewportState,
};
use proptest::prelude::*;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Action {
    Zoom(f64, Option<f64>),
    Move(f64, f64),
    Mark(f64, f64),
    Resize(f64),
    Back,
    Reverse,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0.05f64..20.0, proptest::option::of(-1000.0f64..60000.0)).prop_map(|(m, a)| Action::Zoom(m, a)),
        (-5000.0f64..60000.0, -5000.0f64..60000.0).prop_map(|(s, e)| Action::Move(s, e)),
        (-5000.0f64..60000.0, -5000.0f64..60000.0).prop_map(|(s, e)| Action::Mark(s, e)),
        (50.0f64..3000.0).prop_map(Action::Resize),
        Just(Action::Back),
        Just(Action::Reverse),
    ]
}

fn check_invariants(state: &ViewportState) {
    assert!(state.sequence_min <= state.region_start, "{:?}", state);
    assert!(state.region_start <= state.region_end, "{:?}", state);
    assert!(state.region_end <= state.sequence_max, "{:?}", state);
    assert!(state.region_end - state.region_start <= state.max_canvas_span + 1e-6, "{:?}", state);
    assert!(state.zoom_factor >= state.min_zoom - 1e-12, "{:?}", state);
    assert!(state.zoom_factor <= state.max_zoom + 1e-12, "{:?}", state);
    if state.mark.set {
        assert!(state.mark.start <= state.mark.end, "{:?}", state);
        assert!(state.mark.start >= state.sequence_min, "{:?}", state);
        assert!(state.mark.end <= state.sequence_max, "{:?}", state);
    }
}

fn engine(max_canvas_pixels: f64) -> (ViewCoordinator, ViewportId) {
    engine_on(max_canvas_pixels, 50000.0)
}

fn engine_on(max_canvas_pixels: f64, sequence_end: f64) -> (ViewCoordinator, ViewportId) {
    let config = EngineConfig {
        max_canvas_pixels,
        ..EngineConfig::default()
    };
    let mut coordinator = ViewCoordinator::new(config, Rc::new(NullObserver)).expect("valid config");
    let bounds = SequenceBounds::new(1.0, sequence_end).expect("valid bounds");
    let id = coordinator.open_viewport(bounds);
    check_invariants(&coordinator.state(id).expect("state"));
    coordinator.notify_surface_measured(id, 700.0).expect("measure");
    (coordinator, id)
}

proptest! {
    #[test]
    fn region_and_zoom_stay_valid(
        canvas in 100.0f64..40000.0,
        actions in proptest::collection::vec(action(), 1..40),
    ) {
        let (mut coordinator, id) = engine(canvas);
        check_invariants(&coordinator.state(id).expect("state"));

        for action in actions {
            match action {
                Action::Zoom(m, anchor) => { coordinator.request_zoom_at(id, m, anchor).expect("zoom"); }
                Action::Move(s, e) => { coordinator.request_move(id, s, e).expect("move"); }
                Action::Mark(s, e) => { coordinator.request_mark(id, s, e).expect("mark"); }
                Action::Resize(h) => coordinator.request_resize(id, h).expect("resize"),
                Action::Back => { coordinator.request_back(id).expect("back"); }
                Action::Reverse => coordinator.request_reverse(id).expect("reverse"),
            }
            check_invariants(&coordinator.state(id).expect("state"));
        }
    }

    #[test]
    fn short_sequences_stay_valid(
        sequence_end in 2.0f64..2000.0,
        actions in proptest::collection::vec(action(), 1..20),
    ) {
        let (mut coordinator, id) = engine_on(30000.0, sequence_end);
        check_invariants(&coordinator.state(id).expect("state"));

        for action in actions {
            match action {
                Action::Zoom(m, anchor) => { coordinator.request_zoom_at(id, m, anchor).expect("zoom"); }
                Action::Move(s, e) => { coordinator.request_move(id, s, e).expect("move"); }
                Action::Mark(s, e) => { coordinator.request_mark(id, s, e).expect("mark"); }
                Action::Resize(h) => coordinator.request_resize(id, h).expect("resize"),
                Action::Back => { coordinator.request_back(id).expect("back"); }
                Action::Reverse => coordinator.request_reverse(id).expect("reverse"),
            }
            check_invariants(&coordinator.state(id).expect("state"));
        }
    }

    #[test]
    fn unit_zoom_changes_nothing(
        moves in proptest::collection::vec((0.0f64..50000.0, 0.0f64..50000.0), 0..5),
        near_one in 0.9995f64..1.0005,
    ) {
        let (mut coordinator, id) = engine(30000.0);
        for (s, e) in moves {
            coordinator.request_move(id, s, e).expect("move");
        }

        let before = coordinator.state(id).expect("state");
        let history = coordinator.viewport(id).expect("viewport").history_len();
        let report = coordinator.request_zoom(id, near_one).expect("zoom");

        prop_assert!(!report.changed());
        prop_assert_eq!(coordinator.state(id).expect("state"), before);
        prop_assert_eq!(coordinator.viewport(id).expect("viewport").history_len(), history);
    }

    #[test]
    fn back_undoes_the_last_change(
        m in 0.1f64..10.0,
        start in 1.0f64..40000.0,
    ) {
        let (mut coordinator, id) = engine(30000.0);
        coordinator.request_move(id, start, start + 2000.0).expect("move");
        coordinator.request_mark(id, start + 10.0, start + 20.0).expect("mark");

        let before = coordinator.state(id).expect("state");
        let report = coordinator.request_zoom(id, m).expect("zoom");
        if report.changed() {
            coordinator.request_back(id).expect("back");
        }
        prop_assert_eq!(coordinator.state(id).expect("state"), before);
    }

    #[test]
    fn mark_is_ordered(a in -100.0f64..60000.0, b in -100.0f64..60000.0) {
        let (mut coordinator, id) = engine(30000.0);
        coordinator.request_mark(id, a, b).expect("mark");
        let mark = coordinator.state(id).expect("state").mark;
        prop_assert!(mark.set);
        prop_assert!(mark.start <= mark.end);
        prop_assert!(mark.end - mark.start >= 1.0 - 1e-9);
    }
}
