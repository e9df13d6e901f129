use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::automation::desktop::Desktop;
use crate::coordinates::{CoordinatePoint, CoordinateRegistry, CoordinateRole};
use crate::error::Result;
use crate::system::input::KeyChord;

/// How the translation service's output is put on the clipboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "CopyMethodRepr")]
pub enum CopyMethod {
    /// Click the service's own "copy" button.
    #[default]
    Button,
    /// Click the output, select all, copy.
    SelectAll,
    /// Double-click the output, copy.
    DoubleClick,
    /// Triple-click the output, copy.
    TripleClick,
}

impl CopyMethod {
    /// Coordinate this method clicks.
    pub fn result_role(self) -> CoordinateRole {
        match self {
            CopyMethod::Button => CoordinateRole::ServiceCopyTrigger,
            CopyMethod::SelectAll | CopyMethod::DoubleClick | CopyMethod::TripleClick => {
                CoordinateRole::ServiceOutput
            }
        }
    }

    /// Bind the method to its configured point, once per run.
    pub fn strategy(self, coordinates: &CoordinateRegistry) -> Result<Box<dyn ResultCopier>> {
        let at = coordinates.require(self.result_role())?;
        Ok(match self {
            CopyMethod::Button => Box::new(CopyButton { at }),
            CopyMethod::SelectAll => Box::new(SelectAllCopy { at }),
            CopyMethod::DoubleClick => Box::new(ClickSelectCopy { at, clicks: 2 }),
            CopyMethod::TripleClick => Box::new(ClickSelectCopy { at, clicks: 3 }),
        })
    }
}

impl fmt::Display for CopyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CopyMethod::Button => "button",
            CopyMethod::SelectAll => "select_all",
            CopyMethod::DoubleClick => "double_click",
            CopyMethod::TripleClick => "triple_click",
        };
        f.write_str(name)
    }
}

impl FromStr for CopyMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "button" => Ok(CopyMethod::Button),
            "select_all" => Ok(CopyMethod::SelectAll),
            "double_click" => Ok(CopyMethod::DoubleClick),
            "triple_click" => Ok(CopyMethod::TripleClick),
            other => Err(format!("unknown copy method: {}", other)),
        }
    }
}

/// Older settings files store the method as its index.
#[derive(Deserialize)]
#[serde(untagged)]
enum CopyMethodRepr {
    Index(u8),
    Name(String),
}

impl TryFrom<CopyMethodRepr> for CopyMethod {
    type Error = String;

    fn try_from(repr: CopyMethodRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            CopyMethodRepr::Index(0) => Ok(CopyMethod::Button),
            CopyMethodRepr::Index(1) => Ok(CopyMethod::SelectAll),
            CopyMethodRepr::Index(2) => Ok(CopyMethod::DoubleClick),
            CopyMethodRepr::Index(3) => Ok(CopyMethod::TripleClick),
            CopyMethodRepr::Index(n) => Err(format!("unknown copy method index: {}", n)),
            CopyMethodRepr::Name(name) => name.parse(),
        }
    }
}

/// Performs one copy of the service output and returns what the clipboard then holds.
pub trait ResultCopier: fmt::Debug + Send + Sync {
    fn sample_result(&self, desktop: &mut Desktop) -> Result<String>;
}

#[derive(Debug)]
struct CopyButton {
    at: CoordinatePoint,
}

impl ResultCopier for CopyButton {
    fn sample_result(&self, desktop: &mut Desktop) -> Result<String> {
        desktop.click(self.at, 1)?;
        desktop.read_clipboard()
    }
}

#[derive(Debug)]
struct SelectAllCopy {
    at: CoordinatePoint,
}

impl ResultCopier for SelectAllCopy {
    fn sample_result(&self, desktop: &mut Desktop) -> Result<String> {
        desktop.click(self.at, 1)?;
        desktop.chord(KeyChord::SelectAll)?;
        desktop.chord(KeyChord::Copy)?;
        desktop.read_clipboard()
    }
}

#[derive(Debug)]
struct ClickSelectCopy {
    at: CoordinatePoint,
    clicks: u32,
}

impl ResultCopier for ClickSelectCopy {
    fn sample_result(&self, desktop: &mut Desktop) -> Result<String> {
        desktop.click(self.at, self.clicks)?;
        desktop.chord(KeyChord::Copy)?;
        desktop.read_clipboard()
    }
}
