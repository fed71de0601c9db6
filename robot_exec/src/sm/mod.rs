//! # State machine engine
//!
//! This module implements the generic scheduler shared by every automation on the robot. A
//! [`Machine`] has exactly one active state per tick. Each tick the owner of the machine asks for
//! the [`StateTick`] view of the active state, runs its handler, and hands the handler's
//! [`StateAction`] back to the machine:
//!
//! ```ignore
//! let tick = match self.machine.tick() {
//!     Some(t) => t,
//!     None => return Ok(()),
//! };
//!
//! let action = match tick.state {
//!     MyState::Wait => self.wait(&tick),
//!     MyState::Run => self.run(&tick),
//! };
//!
//! self.machine.end_tick(action)?;
//! ```
//!
//! The machine's context (active state, engaged flag, clock and override flag) is owned by the
//! engine. Handlers only ever see a copy of it through [`StateTick`].
//!
//! State tables are validated when the machine is built, so a machine that exists can only ever
//! name states it knows about. A handler asking for a transition it did not declare is reported
//! as an error and the machine is stopped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    hash::Hash,
};

use log::{debug, info};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Identifier of a state within a machine, usually a fieldless enum.
pub trait StateId: Copy + Eq + Hash + Debug + Display + 'static {
    /// Every state of the machine. Each one must be declared in the machine's state table.
    const ALL: &'static [Self];
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Declaration of a single state.
#[derive(Debug, Clone)]
pub struct StateDecl<S> {
    id: S,
    first: bool,
    must_finish: bool,
    next: Vec<S>,
}

/// A validated set of state declarations.
#[derive(Debug, Clone)]
pub struct StateTable<S: StateId> {
    states: HashMap<S, StateDecl<S>>,
    first: S,
}

/// The view of the machine given to a state handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTick<S> {
    /// The active state.
    pub state: S,

    /// True on the first tick after the state was entered.
    pub initial_call: bool,

    /// Time spent in the state so far, counted in ticks. Zero on the initial call.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// The machine's override flag.
    pub override_set: bool,
}

/// Context of a machine.
#[derive(Debug, Clone)]
struct MachineCtx<S> {
    current: Option<S>,
    engaged: bool,
    ticks_in_state: u64,
    initial_call: bool,
    override_set: bool,
}

/// Counters describing the activity of a machine.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MachineReport {
    /// Number of times the machine completed through `Done`.
    pub num_completions: u64,

    /// Number of engage requests ignored because a must-finish state was active.
    pub num_ignored_engages: u64,

    /// Number of forced engages which abandoned another active state.
    pub num_preemptions: u64,
}

/// A state machine instance.
#[derive(Debug, Clone)]
pub struct Machine<S: StateId> {
    name: &'static str,
    table: StateTable<S>,
    ctx: MachineCtx<S>,
    period_s: f64,
    report: MachineReport,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What a state handler asks the machine to do at the end of the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction<S> {
    /// Remain in the current state.
    Stay,

    /// Transition to the given state, which will see an initial call on the next tick.
    Next(S),

    /// Stop running, clearing the engaged flag.
    Done,
}

/// Errors raised by the state machine engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SmError {
    #[error("Machine {machine} has no first state")]
    NoFirstState { machine: &'static str },

    #[error("Machine {machine} declares both {0} and {1} as first state", .states.0, .states.1)]
    MultipleFirstStates {
        machine: &'static str,
        states: (String, String),
    },

    #[error("Machine {machine} declares state {state} more than once")]
    DuplicateState {
        machine: &'static str,
        state: String,
    },

    #[error("Machine {machine} has no declaration for state {state}")]
    UndeclaredState {
        machine: &'static str,
        state: String,
    },

    #[error("Machine {machine} attempted an undeclared transition from {from} to {to}")]
    UndeclaredTransition {
        machine: &'static str,
        from: String,
        to: String,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<S: StateId> StateDecl<S> {
    pub fn new(id: S) -> Self {
        Self {
            id,
            first: false,
            must_finish: false,
            next: Vec::new(),
        }
    }

    /// Mark this as the first state of the machine, used when engaging without a state.
    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    /// Mark this state as must-finish: non-forced engage requests are ignored while it is active.
    pub fn must_finish(mut self) -> Self {
        self.must_finish = true;
        self
    }

    /// Declare the states this state may transition to.
    pub fn next(mut self, states: &[S]) -> Self {
        self.next.extend_from_slice(states);
        self
    }
}

impl<S: StateId> StateTable<S> {
    /// Validate a set of declarations.
    pub fn new(machine: &'static str, decls: Vec<StateDecl<S>>) -> Result<Self, SmError> {
        let mut states = HashMap::with_capacity(decls.len());
        let mut first: Option<S> = None;

        for decl in decls {
            if decl.first {
                if let Some(f) = first {
                    return Err(SmError::MultipleFirstStates {
                        machine,
                        states: (f.to_string(), decl.id.to_string()),
                    });
                }
                first = Some(decl.id);
            }

            if states.contains_key(&decl.id) {
                return Err(SmError::DuplicateState {
                    machine,
                    state: decl.id.to_string(),
                });
            }

            states.insert(decl.id, decl);
        }

        // Every state of the machine must be declared, and so must every transition target
        for s in S::ALL {
            if !states.contains_key(s) {
                return Err(SmError::UndeclaredState {
                    machine,
                    state: s.to_string(),
                });
            }
        }
        for decl in states.values() {
            for n in decl.next.iter() {
                if !states.contains_key(n) {
                    return Err(SmError::UndeclaredState {
                        machine,
                        state: n.to_string(),
                    });
                }
            }
        }

        match first {
            Some(first) => Ok(Self { states, first }),
            None => Err(SmError::NoFirstState { machine }),
        }
    }

    pub fn first(&self) -> S {
        self.first
    }

    pub fn is_must_finish(&self, state: S) -> bool {
        self.states.get(&state).map_or(false, |d| d.must_finish)
    }

    /// Returns true if `from` declared `to` as one of its transitions.
    pub fn allows(&self, from: S, to: S) -> bool {
        self.states.get(&from).map_or(false, |d| d.next.contains(&to))
    }
}

impl<S> Default for MachineCtx<S> {
    fn default() -> Self {
        Self {
            current: None,
            engaged: false,
            ticks_in_state: 0,
            initial_call: false,
            override_set: false,
        }
    }
}

impl<S: StateId> Machine<S> {
    /// Build a machine from its state declarations.
    ///
    /// `period_s` is the period of the control cycle, used to turn ticks into elapsed time.
    pub fn new(
        name: &'static str,
        decls: Vec<StateDecl<S>>,
        period_s: f64,
    ) -> Result<Self, SmError> {
        Ok(Self {
            name,
            table: StateTable::new(name, decls)?,
            ctx: MachineCtx::default(),
            period_s,
            report: MachineReport::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request that the machine runs from `state`.
    ///
    /// Ignored if the active state is must-finish and `force` is false. Re-engaging the active
    /// state without force keeps its clock. Otherwise the state is entered immediately with its
    /// clock at zero.
    ///
    /// Returns true if the request was accepted.
    pub fn engage(&mut self, state: S, force: bool) -> bool {
        if let (true, Some(current)) = (self.ctx.engaged, self.ctx.current) {
            if !force {
                if self.table.is_must_finish(current) {
                    debug!(
                        "{}: engage in {} ignored, {} must finish",
                        self.name, state, current
                    );
                    self.report.num_ignored_engages += 1;
                    return false;
                }

                if current == state {
                    return true;
                }
            } else if current != state {
                info!("{}: {} preempted by forced engage", self.name, current);
                self.report.num_preemptions += 1;
            }
        }

        info!("{}: engaged in {}", self.name, state);
        self.enter(state);
        self.ctx.engaged = true;

        true
    }

    /// Engage in the first state.
    pub fn engage_first(&mut self, force: bool) -> bool {
        self.engage(self.table.first(), force)
    }

    /// Get the view of the active state for this tick, or `None` if the machine is not engaged.
    pub fn tick(&self) -> Option<StateTick<S>> {
        match (self.ctx.engaged, self.ctx.current) {
            (true, Some(state)) => Some(StateTick {
                state,
                initial_call: self.ctx.initial_call,
                elapsed_s: self.elapsed_s(),
                override_set: self.ctx.override_set,
            }),
            _ => None,
        }
    }

    /// Apply the action returned by the active state's handler.
    ///
    /// An undeclared transition stops the machine and is returned as an error.
    pub fn end_tick(&mut self, action: StateAction<S>) -> Result<(), SmError> {
        let current = match (self.ctx.engaged, self.ctx.current) {
            (true, Some(s)) => s,
            _ => return Ok(()),
        };

        match action {
            StateAction::Stay => {
                self.ctx.ticks_in_state += 1;
                self.ctx.initial_call = false;
            }
            StateAction::Next(next) => {
                if !self.table.allows(current, next) {
                    self.reset();
                    return Err(SmError::UndeclaredTransition {
                        machine: self.name,
                        from: current.to_string(),
                        to: next.to_string(),
                    });
                }

                info!("{}: {} -> {}", self.name, current, next);
                self.enter(next);
            }
            StateAction::Done => {
                info!("{}: {} done", self.name, current);
                self.ctx.engaged = false;
                self.ctx.current = None;
                self.report.num_completions += 1;
            }
        }

        Ok(())
    }

    /// Stop the machine without running any state, and clear the override flag.
    pub fn reset(&mut self) {
        self.ctx = MachineCtx::default();
    }

    /// Returns true if the machine is running a must-finish state.
    pub fn is_must_finish(&self) -> bool {
        match (self.ctx.engaged, self.ctx.current) {
            (true, Some(s)) => self.table.is_must_finish(s),
            _ => false,
        }
    }

    /// Returns true if the machine is not running.
    pub fn is_done(&self) -> bool {
        !self.ctx.engaged
    }

    pub fn current_state(&self) -> Option<S> {
        self.ctx.current
    }

    /// Time spent in the active state.
    ///
    /// Units: seconds
    pub fn elapsed_s(&self) -> f64 {
        util::time::cycles_to_seconds(self.ctx.ticks_in_state, self.period_s)
    }

    pub fn set_override(&mut self, override_set: bool) {
        self.ctx.override_set = override_set;
    }

    pub fn is_override(&self) -> bool {
        self.ctx.override_set
    }

    pub fn report(&self) -> MachineReport {
        self.report
    }

    fn enter(&mut self, state: S) {
        self.ctx.current = Some(state);
        self.ctx.ticks_in_state = 0;
        self.ctx.initial_call = true;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD_S: f64 = 0.02;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Lamp {
        Off,
        Warming,
        Lit,
    }

    impl StateId for Lamp {
        const ALL: &'static [Self] = &[Lamp::Off, Lamp::Warming, Lamp::Lit];
    }

    impl Display for Lamp {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn lamp() -> Machine<Lamp> {
        Machine::new(
            "lamp",
            vec![
                StateDecl::new(Lamp::Off).first().next(&[Lamp::Warming]),
                StateDecl::new(Lamp::Warming)
                    .must_finish()
                    .next(&[Lamp::Lit]),
                StateDecl::new(Lamp::Lit),
            ],
            PERIOD_S,
        )
        .unwrap()
    }

    fn run_ticks(m: &mut Machine<Lamp>, n: usize) {
        for _ in 0..n {
            m.end_tick(StateAction::Stay).unwrap();
        }
    }

    #[test]
    fn test_tick_view() {
        let mut m = lamp();

        assert!(m.is_done());
        assert!(m.tick().is_none());

        assert!(m.engage_first(false));
        let t = m.tick().unwrap();
        assert_eq!(t.state, Lamp::Off);
        assert!(t.initial_call);
        assert_eq!(t.elapsed_s, 0.0);

        run_ticks(&mut m, 5);
        let t = m.tick().unwrap();
        assert!(!t.initial_call);
        assert!((t.elapsed_s - 0.1).abs() < 1e-9);

        // Transition resets the clock and gives an initial call
        m.end_tick(StateAction::Next(Lamp::Warming)).unwrap();
        let t = m.tick().unwrap();
        assert_eq!(t.state, Lamp::Warming);
        assert!(t.initial_call);
        assert_eq!(t.elapsed_s, 0.0);
    }

    #[test]
    fn test_must_finish_ignores_engage() {
        let mut m = lamp();

        m.engage(Lamp::Warming, false);
        run_ticks(&mut m, 10);
        let before = m.tick().unwrap();

        assert!(!m.engage(Lamp::Lit, false));
        assert!(!m.engage(Lamp::Off, false));
        assert_eq!(m.tick().unwrap(), before);
        assert_eq!(m.report().num_ignored_engages, 2);

        // Forcing always switches and resets the clock
        assert!(m.engage(Lamp::Lit, true));
        let t = m.tick().unwrap();
        assert_eq!(t.state, Lamp::Lit);
        assert_eq!(t.elapsed_s, 0.0);
        assert!(t.initial_call);
        assert_eq!(m.report().num_preemptions, 1);
    }

    #[test]
    fn test_reengage_keeps_clock() {
        let mut m = lamp();

        m.engage(Lamp::Off, false);
        run_ticks(&mut m, 3);

        assert!(m.engage(Lamp::Off, false));
        assert!((m.elapsed_s() - 0.06).abs() < 1e-9);

        // But not if forced
        assert!(m.engage(Lamp::Off, true));
        assert_eq!(m.elapsed_s(), 0.0);

        // A non must-finish state can be replaced without force
        assert!(m.engage(Lamp::Lit, false));
        assert_eq!(m.current_state(), Some(Lamp::Lit));
    }

    #[test]
    fn test_done() {
        let mut m = lamp();

        m.engage(Lamp::Lit, false);
        m.end_tick(StateAction::Done).unwrap();

        assert!(m.is_done());
        assert!(m.tick().is_none());
        assert_eq!(m.report().num_completions, 1);

        // Ticking a finished machine changes nothing
        m.end_tick(StateAction::Done).unwrap();
        assert_eq!(m.report().num_completions, 1);

        // And it can be started afresh
        assert!(m.engage(Lamp::Warming, false));
        assert!(m.tick().unwrap().initial_call);
    }

    #[test]
    fn test_undeclared_transition() {
        let mut m = lamp();

        m.engage(Lamp::Off, false);
        let e = m.end_tick(StateAction::Next(Lamp::Lit));

        assert_eq!(
            e,
            Err(SmError::UndeclaredTransition {
                machine: "lamp",
                from: "Off".into(),
                to: "Lit".into()
            })
        );
        assert!(m.is_done());
    }

    #[test]
    fn test_override_and_reset() {
        let mut m = lamp();

        m.set_override(true);
        m.engage(Lamp::Warming, false);
        assert!(m.tick().unwrap().override_set);

        m.reset();
        assert!(m.is_done());
        assert!(!m.is_override());
        assert_eq!(m.current_state(), None);
    }

    #[test]
    fn test_table_validation() {
        let missing_first = Machine::new(
            "lamp",
            vec![
                StateDecl::new(Lamp::Off),
                StateDecl::new(Lamp::Warming),
                StateDecl::new(Lamp::Lit),
            ],
            PERIOD_S,
        );
        assert!(matches!(missing_first, Err(SmError::NoFirstState { .. })));

        let two_firsts = Machine::new(
            "lamp",
            vec![
                StateDecl::new(Lamp::Off).first(),
                StateDecl::new(Lamp::Warming).first(),
                StateDecl::new(Lamp::Lit),
            ],
            PERIOD_S,
        );
        assert!(matches!(two_firsts, Err(SmError::MultipleFirstStates { .. })));

        let duplicate = Machine::new(
            "lamp",
            vec![
                StateDecl::new(Lamp::Off).first(),
                StateDecl::new(Lamp::Off),
                StateDecl::new(Lamp::Warming),
                StateDecl::new(Lamp::Lit),
            ],
            PERIOD_S,
        );
        assert!(matches!(duplicate, Err(SmError::DuplicateState { .. })));

        let missing = Machine::new(
            "lamp",
            vec![
                StateDecl::new(Lamp::Off).first().next(&[Lamp::Lit]),
                StateDecl::new(Lamp::Warming),
            ],
            PERIOD_S,
        );
        assert_eq!(
            missing.err(),
            Some(SmError::UndeclaredState {
                machine: "lamp",
                state: "Lit".into()
            })
        );
    }
}
