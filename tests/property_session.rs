// tests/property_session.rs

use std::path::PathBuf;

use proptest::prelude::*;

use assetforge::errors::CompileErrorKind;
use assetforge::types::ChangeWhileCompiling;
use assetforge::watch::session::SessionCommand;
use assetforge::watch::{CompileOutcome, SessionCore, SessionEvent, SessionState};

#[derive(Debug, Clone, Copy)]
enum Op {
    Change,
    Finish(bool),
    Stop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => Just(Op::Change),
        3 => any::<bool>().prop_map(Op::Finish),
        1 => Just(Op::Stop),
    ]
}

fn policy_strategy() -> impl Strategy<Value = ChangeWhileCompiling> {
    prop_oneof![
        Just(ChangeWhileCompiling::Queue),
        Just(ChangeWhileCompiling::Drop),
    ]
}

fn event(op: Op) -> SessionEvent {
    match op {
        Op::Change => SessionEvent::Changed {
            paths: vec![PathBuf::from("src/main.scss")],
        },
        Op::Finish(ok) => SessionEvent::CompileFinished {
            outcome: if ok {
                CompileOutcome::Success
            } else {
                CompileOutcome::Failed(CompileErrorKind::Syntax)
            },
        },
        Op::Stop => SessionEvent::StopRequested,
    }
}

proptest! {
    /// At most one compile is ever in flight, and every window of changes
    /// during a compile yields at most one follow-up compile.
    #[test]
    fn single_flight_and_coalescing(
        policy in policy_strategy(),
        ops in proptest::collection::vec(op_strategy(), 1..200),
    ) {
        let mut core = SessionCore::new(policy);
        let mut in_flight = false;
        let mut changes_in_window = 0usize;
        let mut exited = false;

        for op in ops {
            if exited {
                break;
            }
            let was_in_flight = in_flight;
            if matches!(op, Op::Change) && in_flight {
                changes_in_window += 1;
            }

            let step = core.step(event(op));
            let starts = step
                .commands
                .iter()
                .filter(|c| matches!(c, SessionCommand::StartCompile))
                .count();
            prop_assert!(starts <= 1);

            match op {
                Op::Change => {
                    if was_in_flight {
                        prop_assert_eq!(starts, 0, "second compile started while compiling");
                    }
                }
                Op::Finish(_) if was_in_flight => {
                    in_flight = false;
                    if starts == 1 {
                        prop_assert!(changes_in_window > 0, "follow-up without a change");
                        prop_assert_eq!(policy, ChangeWhileCompiling::Queue);
                    }
                    changes_in_window = 0;
                }
                Op::Finish(_) => {
                    prop_assert_eq!(starts, 0, "stray completion started a compile");
                }
                Op::Stop => {
                    prop_assert_eq!(starts, 0);
                }
            }

            if starts == 1 {
                in_flight = true;
            }
            prop_assert_eq!(
                core.state() == SessionState::Compiling,
                in_flight,
                "state disagrees with the compiles handed out"
            );
            exited = !step.keep_running;
        }

        if exited {
            prop_assert_eq!(core.state(), SessionState::Idle);
        }
    }

    /// Whatever happened before, a failed compile leaves the session idle and
    /// the next change starts a fresh compile.
    #[test]
    fn idle_after_error(
        policy in policy_strategy(),
        prefix in proptest::collection::vec(
            prop_oneof![Just(Op::Change), any::<bool>().prop_map(Op::Finish)],
            0..50,
        ),
    ) {
        let mut core = SessionCore::new(policy);
        for op in prefix {
            core.step(event(op));
        }
        // Drain to idle.
        while core.state() == SessionState::Compiling {
            core.step(event(Op::Finish(true)));
        }

        core.step(event(Op::Change));
        core.step(event(Op::Finish(false)));
        prop_assert_eq!(core.state(), SessionState::Idle);

        let step = core.step(event(Op::Change));
        prop_assert_eq!(step.commands, vec![SessionCommand::StartCompile]);
    }
}
