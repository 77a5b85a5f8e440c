use std::fmt::Display;

/// Every binary input reported by the Sixaxis controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Select,
    L3,
    R3,
    Start,
    DPadUp,
    DPadRight,
    DPadDown,
    DPadLeft,
    L2,
    R2,
    L1,
    R1,
    Triangle,
    Circle,
    Cross,
    Square,
    /// PS (home/power) button
    Home,
}

impl Button {
    /// All buttons in report order
    pub const ALL: [Button; 17] = [
        Button::Select,
        Button::L3,
        Button::R3,
        Button::Start,
        Button::DPadUp,
        Button::DPadRight,
        Button::DPadDown,
        Button::DPadLeft,
        Button::L2,
        Button::R2,
        Button::L1,
        Button::R1,
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
        Button::Home,
    ];

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Button::Select => "SELECT",
            Button::L3 => "LEFT THREE",
            Button::R3 => "RIGHT THREE",
            Button::Start => "START",
            Button::DPadUp => "UP",
            Button::DPadRight => "RIGHT",
            Button::DPadDown => "DOWN",
            Button::DPadLeft => "LEFT",
            Button::L2 => "LEFT TWO",
            Button::R2 => "RIGHT TWO",
            Button::L1 => "LEFT ONE",
            Button::R1 => "RIGHT ONE",
            Button::Triangle => "TRIANGLE",
            Button::Circle => "CIRCLE",
            Button::Cross => "CROSS",
            Button::Square => "SQUARE",
            Button::Home => "PS",
        }
    }
}

impl Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compact set of buttons, one bit per [Button]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u32);

impl ButtonSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Buttons in this set that are not in `other`
    pub fn difference(&self, other: ButtonSet) -> ButtonSet {
        Self(self.0 & !other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.contains(*b))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = ButtonSet::empty();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

/// Stick position, 0-255 on each axis with 128 at rest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StickPosition {
    pub x: u8,
    pub y: u8,
}

/// Analog pressure of the shoulder buttons, 0-255
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerPressure {
    pub l1: u8,
    pub r1: u8,
    pub l2: u8,
    pub r2: u8,
}

/// Decoded snapshot of a single input report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub buttons: ButtonSet,
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub pressure: TriggerPressure,
    pub acceleration: i8,
}

impl ControllerState {
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons.contains(button)
    }

    /// Returns the buttons that are pressed now but were released in the
    /// previous state.
    pub fn pressed_since(&self, previous: &ControllerState) -> ButtonSet {
        self.buttons.difference(previous.buttons)
    }
}
