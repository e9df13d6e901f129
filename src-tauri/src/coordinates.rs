use serde::{Deserialize, Serialize};

use crate::automation::copy_method::CopyMethod;
use crate::error::{Error, Result};

/// A screen position, persisted as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct CoordinatePoint {
    pub x: i32,
    pub y: i32,
}

impl CoordinatePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for CoordinatePoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<CoordinatePoint> for (i32, i32) {
    fn from(point: CoordinatePoint) -> Self {
        (point.x, point.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateRole {
    /// Poedit source text box.
    SourceField,
    /// Poedit translation text box.
    TargetField,
    /// Input box of the translation service.
    ServiceInput,
    /// "Copy" button of the translation service.
    ServiceCopyTrigger,
    /// Output area of the translation service, for the selection-based copy methods.
    ServiceOutput,
    /// Press point of the scroll gesture.
    GestureAnchor,
}

impl CoordinateRole {
    pub fn label(self) -> &'static str {
        match self {
            CoordinateRole::SourceField => "source field",
            CoordinateRole::TargetField => "target field",
            CoordinateRole::ServiceInput => "service input",
            CoordinateRole::ServiceCopyTrigger => "service copy button",
            CoordinateRole::ServiceOutput => "service output",
            CoordinateRole::GestureAnchor => "gesture anchor",
        }
    }
}

/// Named points captured by the settings window. Read-only while a run is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateRegistry {
    #[serde(alias = "poedit_source")]
    pub source_field: Option<CoordinatePoint>,
    #[serde(alias = "poedit_target")]
    pub target_field: Option<CoordinatePoint>,
    #[serde(alias = "service_source")]
    pub service_input: Option<CoordinatePoint>,
    #[serde(alias = "service_copy_button")]
    pub service_copy_trigger: Option<CoordinatePoint>,
    pub service_output: Option<CoordinatePoint>,
    pub gesture_anchor: Option<CoordinatePoint>,
}

impl CoordinateRegistry {
    pub fn get(&self, role: CoordinateRole) -> Option<CoordinatePoint> {
        match role {
            CoordinateRole::SourceField => self.source_field,
            CoordinateRole::TargetField => self.target_field,
            CoordinateRole::ServiceInput => self.service_input,
            CoordinateRole::ServiceCopyTrigger => self.service_copy_trigger,
            CoordinateRole::ServiceOutput => self.service_output,
            CoordinateRole::GestureAnchor => self.gesture_anchor,
        }
    }

    pub fn set(&mut self, role: CoordinateRole, point: Option<CoordinatePoint>) {
        let slot = match role {
            CoordinateRole::SourceField => &mut self.source_field,
            CoordinateRole::TargetField => &mut self.target_field,
            CoordinateRole::ServiceInput => &mut self.service_input,
            CoordinateRole::ServiceCopyTrigger => &mut self.service_copy_trigger,
            CoordinateRole::ServiceOutput => &mut self.service_output,
            CoordinateRole::GestureAnchor => &mut self.gesture_anchor,
        };
        *slot = point;
    }

    /// Look up a point that must be present.
    pub fn require(&self, role: CoordinateRole) -> Result<CoordinatePoint> {
        self.get(role)
            .ok_or_else(|| Error::MissingCoordinates(vec![role]))
    }

    /// Fail with every missing role at once, so the operator can fix them in one pass.
    pub fn ensure(&self, roles: &[CoordinateRole]) -> Result<()> {
        let missing: Vec<CoordinateRole> = roles
            .iter()
            .copied()
            .filter(|role| self.get(*role).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingCoordinates(missing))
        }
    }
}

/// Roles a run needs, given the copy method and whether the scroll gesture is on.
pub fn required_roles(copy_method: CopyMethod, use_gesture: bool) -> Vec<CoordinateRole> {
    let mut roles = vec![
        CoordinateRole::SourceField,
        CoordinateRole::TargetField,
        CoordinateRole::ServiceInput,
        copy_method.result_role(),
    ];
    if use_gesture {
        roles.push(CoordinateRole::GestureAnchor);
    }
    roles
}
