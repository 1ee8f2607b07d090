use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::ArrowDirection;

/// Color shown by a single signal head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum LightState {
    #[default]
    Red,
    /// Transitional state at the start of a phase that turns a red signal green.
    RedToGreen,
    Green,
    /// Transitional ("yellow") state at the end of a phase that turns a green signal red.
    GreenToRed,
}

impl LightState {
    pub const ALL: [LightState; 4] = [
        LightState::Red,
        LightState::RedToGreen,
        LightState::Green,
        LightState::GreenToRed,
    ];

    pub fn is_green(self) -> bool {
        self == LightState::Green
    }

    /// Flip between the two steady states. Transitional states settle to their target.
    pub fn toggled(self) -> Self {
        match self {
            LightState::Red | LightState::GreenToRed => LightState::Green,
            LightState::Green | LightState::RedToGreen => LightState::Red,
        }
    }
}

/// How the three sub-signals of a [`SignalGroup`] relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum LightMode {
    /// One signal for all directions.
    #[default]
    Simple,
    /// Separate left-turn signal; forward and right follow the main signal.
    SingleLeft,
    /// Separate right-turn signal; forward and left follow the main signal.
    SingleRight,
    /// Independent left, forward and right signals.
    All,
}

impl LightMode {
    /// Next mode in the editor cycle.
    pub fn next(self) -> Self {
        match self {
            LightMode::Simple => LightMode::SingleLeft,
            LightMode::SingleLeft => LightMode::SingleRight,
            LightMode::SingleRight => LightMode::All,
            LightMode::All => LightMode::Simple,
        }
    }
}

/// Vehicle classes that can be given their own signal on a segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum VehicleClass {
    Passenger,
    Bus,
    Taxi,
    Cargo,
    Service,
    Emergency,
    Tram,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 7] = [
        VehicleClass::Passenger,
        VehicleClass::Bus,
        VehicleClass::Taxi,
        VehicleClass::Cargo,
        VehicleClass::Service,
        VehicleClass::Emergency,
        VehicleClass::Tram,
    ];
}

/// One of the three stored signal values of a [`SignalGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubSignal {
    Main,
    Left,
    Right,
}

impl SubSignal {
    pub const ALL: [SubSignal; 3] = [SubSignal::Main, SubSignal::Left, SubSignal::Right];
}

/// Signal heads for one vehicle class on one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalGroup {
    pub mode: LightMode,
    pub main: LightState,
    pub left: LightState,
    pub right: LightState,
}

impl SignalGroup {
    /// A `Simple` group showing `state` in every direction.
    pub fn uniform(state: LightState) -> Self {
        Self {
            mode: LightMode::Simple,
            main: state,
            left: state,
            right: state,
        }
    }

    /// Raw stored value of a sub-signal.
    pub fn get(&self, sub: SubSignal) -> LightState {
        match sub {
            SubSignal::Main => self.main,
            SubSignal::Left => self.left,
            SubSignal::Right => self.right,
        }
    }

    pub fn set(&mut self, sub: SubSignal, state: LightState) {
        match sub {
            SubSignal::Main => self.main = state,
            SubSignal::Left => self.left = state,
            SubSignal::Right => self.right = state,
        }
    }

    /// Signal governing left turns under the current mode.
    pub fn left_signal(&self) -> LightState {
        match self.mode {
            LightMode::Simple | LightMode::SingleRight => self.main,
            LightMode::SingleLeft | LightMode::All => self.left,
        }
    }

    /// Signal governing right turns under the current mode.
    pub fn right_signal(&self) -> LightState {
        match self.mode {
            LightMode::Simple | LightMode::SingleLeft => self.main,
            LightMode::SingleRight | LightMode::All => self.right,
        }
    }

    /// Signal that governs traffic leaving in `direction`.
    ///
    /// U-turns cross the opposing lanes, so they follow the left signal in
    /// right-hand traffic and the right signal in left-hand traffic.
    pub fn for_direction(&self, direction: ArrowDirection, left_hand_drive: bool) -> LightState {
        match direction {
            ArrowDirection::Forward => self.main,
            ArrowDirection::Left => self.left_signal(),
            ArrowDirection::Right => self.right_signal(),
            ArrowDirection::Turn if left_hand_drive => self.right_signal(),
            ArrowDirection::Turn => self.left_signal(),
        }
    }

    /// Switch mode and copy the main value into sub-signals the new mode ties to it.
    pub fn change_mode(&mut self, mode: LightMode) {
        self.mode = mode;
        match mode {
            LightMode::Simple => {
                self.left = self.main;
                self.right = self.main;
            }
            LightMode::SingleLeft => self.right = self.main,
            LightMode::SingleRight => self.left = self.main,
            LightMode::All => {}
        }
    }

    pub fn cycle_mode(&mut self) {
        self.change_mode(self.mode.next());
    }

    /// Toggle the main signal; sub-signals tied to it by the mode follow.
    pub fn toggle_main(&mut self) {
        self.main = self.main.toggled();
        self.change_mode(self.mode);
    }

    /// Whether any direction is released under the current mode. Stored
    /// sub-signals the mode ties to `main` are ignored.
    pub fn any_green(&self) -> bool {
        [self.main, self.left_signal(), self.right_signal()]
            .iter()
            .any(|state| state.is_green())
    }
}

/// Light configuration of one segment at one intersection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SegmentLights {
    /// Signal heads per vehicle class.
    pub signals: BTreeMap<VehicleClass, SignalGroup>,
    /// Pedestrian crossing signal; `None` when the segment has no crossing.
    pub pedestrian: Option<LightState>,
    /// When false the pedestrian signal is derived from the vehicle signals.
    pub manual_pedestrian: bool,
    /// Vehicle class served by each incoming lane, keyed by lane index.
    pub lane_classes: BTreeMap<u8, VehicleClass>,
}

impl SegmentLights {
    /// Build a segment whose lanes are assigned to classes, one `Simple`
    /// signal group per distinct class, with an automatic pedestrian signal.
    pub fn with_lanes(lanes: &[(u8, VehicleClass)], initial: LightState) -> Self {
        let mut lights = SegmentLights::default();
        for &(lane, class) in lanes {
            lights.lane_classes.insert(lane, class);
            lights
                .signals
                .entry(class)
                .or_insert_with(|| SignalGroup::uniform(initial));
        }
        lights.pedestrian = Some(lights.auto_pedestrian());
        lights
    }

    /// A segment without any vehicle signal contributes nothing to a phase.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signal(&self, class: VehicleClass) -> Option<&SignalGroup> {
        self.signals.get(&class)
    }

    pub fn signal_mut(&mut self, class: VehicleClass) -> Option<&mut SignalGroup> {
        self.signals.get_mut(&class)
    }

    /// Class and signal group serving `lane`.
    pub fn for_lane(&self, lane: u8) -> Option<(VehicleClass, &SignalGroup)> {
        let class = *self.lane_classes.get(&lane)?;
        self.signals.get(&class).map(|group| (class, group))
    }

    /// Pedestrians may cross while every vehicle signal on the segment is red.
    pub fn auto_pedestrian(&self) -> LightState {
        if self.signals.values().any(SignalGroup::any_green) {
            LightState::Red
        } else {
            LightState::Green
        }
    }

    /// Pedestrian state actually shown: the stored one in manual mode,
    /// otherwise derived from the vehicle signals.
    pub fn effective_pedestrian(&self) -> Option<LightState> {
        self.pedestrian.map(|stored| {
            if self.manual_pedestrian {
                stored
            } else {
                self.auto_pedestrian()
            }
        })
    }

    /// Toggle every vehicle signal's main value.
    pub fn toggle_all(&mut self) {
        for group in self.signals.values_mut() {
            group.toggle_main();
        }
    }
}
