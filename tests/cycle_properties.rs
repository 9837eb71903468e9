// tests/cycle_properties.rs

use proptest::prelude::*;

use hotserve::cycle::{CycleEvent, CycleFailure, CycleState, ReloadKind, RunningState, transition};
use hotserve::types::TaskResult;

fn event_strategy() -> impl Strategy<Value = CycleEvent> {
    prop_oneof![
        (any::<bool>(), any::<bool>())
            .prop_map(|(main, renderer)| CycleEvent::Running(RunningState { main, renderer })),
        proptest::collection::vec(any::<bool>(), 1..4).prop_map(|oks| {
            CycleEvent::Results(
                oks.into_iter()
                    .map(|ok| {
                        if ok {
                            TaskResult::Success
                        } else {
                            TaskResult::Failure("failed".to_string())
                        }
                    })
                    .collect(),
            )
        }),
    ]
}

/// Reference model of a cycle, tracked separately from `CycleState`.
#[derive(Debug, Default)]
struct Model {
    running: bool,
    main_touched: bool,
    pending: Option<bool>,
}

impl Model {
    /// Apply `event`; returns the verdict of the cycle it closes, if any.
    fn apply(&mut self, event: &CycleEvent) -> Option<(bool, bool)> {
        match event {
            CycleEvent::Running(r) => {
                self.running = r.main || r.renderer;
                self.main_touched = self.main_touched || r.main;
            }
            CycleEvent::Results(results) => {
                self.pending = Some(results.iter().all(TaskResult::is_success));
            }
        }

        if self.running {
            return None;
        }
        let verdict = self.pending.take()?;
        let main_touched = std::mem::take(&mut self.main_touched);
        Some((verdict, main_touched))
    }
}

proptest! {
    #[test]
    fn outcomes_follow_the_cycle_rules(
        events in proptest::collection::vec(event_strategy(), 0..60),
        entry_exists in proptest::collection::vec(any::<bool>(), 60),
    ) {
        let mut state = CycleState::default();
        let mut model = Model::default();
        prop_assert!(!state.main_touched);
        prop_assert!(!state.renderer_touched);

        for (i, event) in events.iter().enumerate() {
            let before = state.clone();
            let mut checked = false;
            let outcome = transition(&mut state, event, || {
                checked = true;
                entry_exists[i]
            });
            let expected = model.apply(event);

            // An outcome exactly when the model closes a cycle: never zero,
            // never two.
            prop_assert_eq!(outcome.is_some(), expected.is_some(), "event {} {:?}", i, event);
            prop_assert_eq!(outcome.is_some(), state.cycle_closed);

            match (outcome, expected) {
                (Some(outcome), Some((verdict, main_touched))) => {
                    prop_assert!(!state.any_running);
                    prop_assert!(!state.main_touched);
                    prop_assert!(!state.renderer_touched);
                    prop_assert_eq!(state.pending_verdict, None);

                    if !verdict {
                        prop_assert!(!outcome.success);
                        prop_assert_eq!(outcome.failure, Some(CycleFailure::TaskFailed));
                        prop_assert!(!checked);
                    } else if !entry_exists[i] {
                        prop_assert!(checked);
                        prop_assert!(!outcome.success);
                        prop_assert_eq!(outcome.reload, None);
                        prop_assert_eq!(outcome.failure, Some(CycleFailure::MissingEntryPoint));
                    } else {
                        prop_assert!(outcome.success);
                        let kind = if main_touched { ReloadKind::Hot } else { ReloadKind::Soft };
                        prop_assert_eq!(outcome.reload, Some(kind));
                    }
                }
                _ => {
                    // Touched flags only grow within a cycle.
                    prop_assert!(state.main_touched >= before.main_touched);
                    prop_assert!(state.renderer_touched >= before.renderer_touched);
                    prop_assert!(!checked);
                }
            }
        }
    }

    #[test]
    fn idle_running_events_never_close_without_results(
        flags in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..40),
    ) {
        let mut state = CycleState::default();
        for (main, renderer) in flags {
            let event = CycleEvent::Running(RunningState { main, renderer });
            prop_assert!(transition(&mut state, &event, || true).is_none());
        }
    }
}
