//! Ambient environment signals.

use std::str::FromStr;

/// Network effective connection type as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveConnectionType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

impl EffectiveConnectionType {
    /// 2G-class connections are treated like an explicit save-data request.
    pub fn is_constrained(&self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

impl FromStr for EffectiveConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slow-2g" => Ok(Self::Slow2g),
            "2g" => Ok(Self::TwoG),
            "3g" => Ok(Self::ThreeG),
            "4g" => Ok(Self::FourG),
            other => Err(format!("unknown effective connection type '{}'", other)),
        }
    }
}

/// Raw connection information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionHint {
    /// Explicit save-data preference.
    pub save_data: bool,
    /// Effective connection type, if the platform reports one.
    pub effective_type: Option<EffectiveConnectionType>,
}

impl ConnectionHint {
    /// Collapses the hint into the boolean save-data signal.
    pub fn implies_save_data(&self) -> bool {
        self.save_data || self.effective_type.is_some_and(|t| t.is_constrained())
    }
}

/// Snapshot of the ambient signals the policy evaluates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentSignal {
    pub reduced_motion: bool,
    pub save_data: bool,
}

impl EnvironmentSignal {
    pub fn new(reduced_motion: bool, save_data: bool) -> Self {
        Self {
            reduced_motion,
            save_data,
        }
    }

    /// Builds a signal from a motion preference and connection hint.
    pub fn from_parts(reduced_motion: bool, connection: ConnectionHint) -> Self {
        Self::new(reduced_motion, connection.implies_save_data())
    }
}
