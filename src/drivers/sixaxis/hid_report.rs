//! Layout of the Sixaxis (DualShock 3) USB input report.
//! Reference: https://github.com/torvalds/linux/blob/master/drivers/hid/hid-sony.c
use std::fmt::Display;

use packed_struct::prelude::*;
use packed_struct::PrimitiveEnum;

use super::{
    driver::REPORT_SIZE,
    error::DecodeError,
    state::{Button, ButtonSet, ControllerState, StickPosition, TriggerPressure},
};

/// Codes reported in byte 2. The controller reports a single code for this
/// group, so only one of these can be decoded from any given report.
// NOTE: a diagonal d-pad or a combination such as UP + START arrives as an OR
// of these codes and decodes to no button at all.
#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum SystemButton {
    Select = 0x01,
    L3 = 0x02,
    R3 = 0x04,
    Start = 0x08,
    Up = 0x10,
    Right = 0x20,
    Down = 0x40,
    Left = 0x80,
}

impl SystemButton {
    pub fn button(&self) -> Button {
        match self {
            Self::Select => Button::Select,
            Self::L3 => Button::L3,
            Self::R3 => Button::R3,
            Self::Start => Button::Start,
            Self::Up => Button::DPadUp,
            Self::Right => Button::DPadRight,
            Self::Down => Button::DPadDown,
            Self::Left => Button::DPadLeft,
        }
    }
}

/// Codes reported in byte 3. Same single-code semantics as [SystemButton].
#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum ActionButton {
    L2 = 0x01,
    R2 = 0x02,
    L1 = 0x04,
    R1 = 0x08,
    Triangle = 0x10,
    Circle = 0x20,
    Cross = 0x40,
    Square = 0x80,
}

impl ActionButton {
    pub fn button(&self) -> Button {
        match self {
            Self::L2 => Button::L2,
            Self::R2 => Button::R2,
            Self::L1 => Button::L1,
            Self::R1 => Button::R1,
            Self::Triangle => Button::Triangle,
            Self::Circle => Button::Circle,
            Self::Cross => Button::Cross,
            Self::Square => Button::Square,
        }
    }
}

/// Sixaxis input report (report id 0x01) as fetched with HID GET_REPORT
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "49")]
pub struct PackedInputDataReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    // byte 1
    #[packed_field(bytes = "1")]
    pub unk_1: u8,

    // byte 2-3
    #[packed_field(bytes = "2")]
    pub system_buttons: u8, // See [SystemButton]
    #[packed_field(bytes = "3")]
    pub action_buttons: u8, // See [ActionButton]

    // byte 4
    #[packed_field(bytes = "4")]
    pub ps: u8, // Nonzero while pressed
    // byte 5
    #[packed_field(bytes = "5")]
    pub unk_5: u8,

    // byte 6-9
    #[packed_field(bytes = "6")]
    pub joystick_l_x: u8,
    #[packed_field(bytes = "7")]
    pub joystick_l_y: u8,
    #[packed_field(bytes = "8")]
    pub joystick_r_x: u8,
    #[packed_field(bytes = "9")]
    pub joystick_r_y: u8,

    // byte 18-21
    #[packed_field(bytes = "18")]
    pub l2_pressure: u8,
    #[packed_field(bytes = "19")]
    pub r2_pressure: u8,
    #[packed_field(bytes = "20")]
    pub l1_pressure: u8,
    #[packed_field(bytes = "21")]
    pub r1_pressure: u8,

    // byte 42-48, one byte of each sensor axis
    #[packed_field(bytes = "42")]
    pub roll_raw: u8,
    #[packed_field(bytes = "44")]
    pub yaw_raw: u8,
    #[packed_field(bytes = "46")]
    pub pitch_raw: u8,
    #[packed_field(bytes = "48")]
    pub acceleration_raw: u8,
}

impl Default for PackedInputDataReport {
    fn default() -> Self {
        Self {
            report_id: 0x01,
            unk_1: 0,
            system_buttons: 0,
            action_buttons: 0,
            ps: 0,
            unk_5: 0,
            joystick_l_x: 128,
            joystick_l_y: 128,
            joystick_r_x: 128,
            joystick_r_y: 128,
            l2_pressure: 0,
            r2_pressure: 0,
            l1_pressure: 0,
            r1_pressure: 0,
            roll_raw: 0,
            yaw_raw: 0,
            pitch_raw: 0,
            acceleration_raw: 0,
        }
    }
}

impl PackedInputDataReport {
    /// Unpack a report from the given buffer. Anything past [REPORT_SIZE]
    /// bytes is ignored.
    pub fn from_buffer(buf: &[u8]) -> Result<Self, DecodeError> {
        let malformed = || DecodeError::MalformedReport {
            expected: REPORT_SIZE,
            actual: buf.len(),
        };
        let Some(slice) = buf.get(..REPORT_SIZE) else {
            return Err(malformed());
        };
        let sized: &[u8; REPORT_SIZE] = slice.try_into().map_err(|_| malformed())?;
        Ok(Self::unpack(sized)?)
    }

    pub fn system_button(&self) -> Option<SystemButton> {
        SystemButton::from_primitive(self.system_buttons)
    }

    pub fn action_button(&self) -> Option<ActionButton> {
        ActionButton::from_primitive(self.action_buttons)
    }

    pub fn roll(&self) -> i8 {
        self.roll_raw as i8
    }

    pub fn yaw(&self) -> i8 {
        self.yaw_raw as i8
    }

    pub fn pitch(&self) -> i8 {
        self.pitch_raw as i8
    }

    pub fn acceleration(&self) -> i8 {
        self.acceleration_raw as i8
    }

    /// Returns the decoded controller state for this report
    pub fn state(&self) -> ControllerState {
        let mut buttons = ButtonSet::empty();
        if let Some(button) = self.system_button() {
            buttons.insert(button.button());
        }
        if let Some(button) = self.action_button() {
            buttons.insert(button.button());
        }
        if self.ps != 0 {
            buttons.insert(Button::Home);
        }

        ControllerState {
            buttons,
            left_stick: StickPosition {
                x: self.joystick_l_x,
                y: self.joystick_l_y,
            },
            right_stick: StickPosition {
                x: self.joystick_r_x,
                y: self.joystick_r_y,
            },
            pressure: TriggerPressure {
                l1: self.l1_pressure,
                r1: self.r1_pressure,
                l2: self.l2_pressure,
                r2: self.r2_pressure,
            },
            acceleration: self.acceleration(),
        }
    }

    /// Returns an object that prints every field of the report in a human
    /// readable form.
    pub fn display(&self) -> ReportDisplay<'_> {
        ReportDisplay(self)
    }
}

/// Human readable rendering of a [PackedInputDataReport]
pub struct ReportDisplay<'a>(&'a PackedInputDataReport);

impl Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let report = self.0;
        if let Some(button) = report.system_button() {
            writeln!(f, "\t{} pressed", button.button())?;
        }
        if let Some(button) = report.action_button() {
            writeln!(f, "\t{} pressed", button.button())?;
        }
        writeln!(f, "\tPS button: {}", report.ps)?;
        writeln!(
            f,
            "\tLeft Analog (X,Y): ({},{})",
            report.joystick_l_x, report.joystick_l_y
        )?;
        writeln!(
            f,
            "\tRight Analog (X,Y): ({},{})",
            report.joystick_r_x, report.joystick_r_y
        )?;
        writeln!(
            f,
            "\tL2 Value: {}\tR2 Value: {}",
            report.l2_pressure, report.r2_pressure
        )?;
        writeln!(
            f,
            "\tL1 Value: {}\tR1 Value: {}",
            report.l1_pressure, report.r1_pressure
        )?;
        writeln!(
            f,
            "\tRoll (x axis): {} Yaw (y axis): {} Pitch (z axis) {}",
            report.roll(),
            report.yaw(),
            report.pitch()
        )?;
        write!(f, "\tAcceleration: {}", report.acceleration())
    }
}

/// Decode a raw input report into a [ControllerState]
pub fn decode(buf: &[u8]) -> Result<ControllerState, DecodeError> {
    let report = PackedInputDataReport::from_buffer(buf)?;
    Ok(report.state())
}
