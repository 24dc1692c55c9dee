// taint.rs - Closed vocabularies shared by tools, rules and policies.
//
// Every enum here serializes to the SCREAMING_SNAKE_CASE string the
// enforcement runtime expects, and parses back from exactly that string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Security capability of a tool, used to classify tools and to express
/// class-level rules and patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaintClass {
    SafeRead,
    SensitiveRead,
    SafeWrite,
    ConsequentialWrite,
    UnsafeExecute,
    HumanVerify,
    Sanitizer,
}

impl TaintClass {
    pub const ALL: [TaintClass; 7] = [
        TaintClass::SafeRead,
        TaintClass::SensitiveRead,
        TaintClass::SafeWrite,
        TaintClass::ConsequentialWrite,
        TaintClass::UnsafeExecute,
        TaintClass::HumanVerify,
        TaintClass::Sanitizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaintClass::SafeRead => "SAFE_READ",
            TaintClass::SensitiveRead => "SENSITIVE_READ",
            TaintClass::SafeWrite => "SAFE_WRITE",
            TaintClass::ConsequentialWrite => "CONSEQUENTIAL_WRITE",
            TaintClass::UnsafeExecute => "UNSAFE_EXECUTE",
            TaintClass::HumanVerify => "HUMAN_VERIFY",
            TaintClass::Sanitizer => "SANITIZER",
        }
    }
}

impl fmt::Display for TaintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaintClass {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaintClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownTaintClass {
                found: s.to_string(),
            })
    }
}

/// What a taint rule does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaintAction {
    /// Attach `tag` to the session.
    AddTaint,
    /// Refuse the call if the session carries any of `forbidden_tags`.
    CheckTaint,
    /// Block the second matching call.
    BlockSecond,
    /// Block the call that completes the pattern.
    BlockCurrent,
}

impl TaintAction {
    pub const ALL: [TaintAction; 4] = [
        TaintAction::AddTaint,
        TaintAction::CheckTaint,
        TaintAction::BlockSecond,
        TaintAction::BlockCurrent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaintAction::AddTaint => "ADD_TAINT",
            TaintAction::CheckTaint => "CHECK_TAINT",
            TaintAction::BlockSecond => "BLOCK_SECOND",
            TaintAction::BlockCurrent => "BLOCK_CURRENT",
        }
    }
}

impl fmt::Display for TaintAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaintAction {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaintAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownAction {
                found: s.to_string(),
            })
    }
}

/// Per-tool gate, independent of session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticAction {
    #[default]
    Allow,
    Deny,
}

impl StaticAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticAction::Allow => "ALLOW",
            StaticAction::Deny => "DENY",
        }
    }

    /// Parse a static action for `tool`, naming the tool in the error.
    pub fn parse_for(tool: &str, s: &str) -> Result<Self, PolicyError> {
        match s {
            "ALLOW" => Ok(StaticAction::Allow),
            "DENY" => Ok(StaticAction::Deny),
            other => Err(PolicyError::UnknownStaticAction {
                tool: tool.to_string(),
                found: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StaticAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
