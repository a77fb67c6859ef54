use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{SchedulerError, SchedulerResult};

/// Hold markers understood by every supported scheduler.
pub const KNOWN_HOLD_TYPES: &[HoldType] = &[HoldType::User];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[non_exhaustive]
pub enum HoldType {
    /// Released by the job owner (`scontrol release`, `qrls`).
    #[strum(serialize = "user-hold")]
    #[serde(rename = "user-hold")]
    User,
}

impl HoldType {
    pub fn parse(token: &str) -> SchedulerResult<Self> {
        Self::from_str(token.trim()).map_err(|_| {
            let known: Vec<&str> = KNOWN_HOLD_TYPES.iter().map(AsRef::as_ref).collect();
            SchedulerError::validation(format!(
                "unknown hold type `{token}`, expected one of: {}",
                known.join(", ")
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HoldType, KNOWN_HOLD_TYPES};
    use crate::error::SchedulerError;

    #[test]
    fn parse_known() {
        for hold in KNOWN_HOLD_TYPES {
            assert_eq!(HoldType::parse(hold.as_ref()).unwrap(), *hold);
        }
        assert_eq!(HoldType::User.to_string(), "user-hold");
    }

    #[test]
    fn parse_unknown() {
        let err = HoldType::parse("operator-hold").unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
    }
}
