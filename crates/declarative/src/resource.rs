//! Desired and observed resource views used by the differ
//!
//! Resource kinds expose their comparable scalar fields through [`Field`], so
//! one differ serves applications, versions, environments and templates.

use crate::settings::OptionSetting;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A comparable scalar field
///
/// The declaration order is the order changes are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Description,
    VersionLabel,
    TemplateName,
    SolutionStackName,
    CnamePrefix,
}

impl Field {
    /// All fields in reporting order
    pub const ALL: [Self; 5] = [
        Self::Description,
        Self::VersionLabel,
        Self::TemplateName,
        Self::SolutionStackName,
        Self::CnamePrefix,
    ];

    /// Key used in change reports
    pub fn key(self) -> &'static str {
        match self {
            Self::Description => "Description",
            Self::VersionLabel => "VersionLabel",
            Self::TemplateName => "TemplateName",
            Self::SolutionStackName => "SolutionStackName",
            Self::CnamePrefix => "CNAMEPrefix",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Caller-declared target attributes for one resource
pub trait DesiredSpec {
    /// Value declared for a field
    ///
    /// `None` means the caller did not declare the field and it is not
    /// compared. `Some("")` declares the field as empty.
    fn declared(&self, field: Field) -> Option<&str>;

    /// Desired option settings, in caller order
    fn option_settings(&self) -> &[OptionSetting] {
        &[]
    }
}

/// A freshly fetched snapshot of a live resource
pub trait ObservedResource {
    /// Current value of a field, if the resource reports one
    fn field(&self, field: Field) -> Option<&str>;

    /// Current option settings
    fn option_settings(&self) -> &[OptionSetting] {
        &[]
    }
}
