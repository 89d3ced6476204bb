//! The operation taxonomy shared by every generated capture trigger.
//!
//! The integer codes are written into every audit row and hardcoded into every
//! installed trigger body. They are frozen: renumbering a variant would change
//! the meaning of rows already captured.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// OperationCode
// ---------------------------------------------------------------------------

/// Kind of row mutation recorded in an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i64)]
pub enum OperationCode {
    Insert = 1,
    Update = 2,
    Delete = 3,
}

impl OperationCode {
    /// Every operation in code order. The single source for seeding
    /// `operation_taxonomy` and for emitting trigger literals.
    pub const ALL: [Self; 3] = [Self::Insert, Self::Update, Self::Delete];

    /// Integer stored in `audit_operation_id`.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Label stored in `operation_taxonomy.label`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// SQL trigger event keyword.
    #[must_use]
    pub const fn trigger_event(self) -> &'static str {
        self.label()
    }

    /// Row alias whose values are snapshotted: the new state for insert and
    /// update, the prior state for delete.
    #[must_use]
    pub const fn row_alias(self) -> &'static str {
        match self {
            Self::Insert | Self::Update => "NEW",
            Self::Delete => "OLD",
        }
    }

    /// Snake-case form used in JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl TryFrom<i64> for OperationCode {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or(CoreError::UnknownOperation(code))
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(OperationCode::Insert, 1, "INSERT", "NEW")]
    #[case(OperationCode::Update, 2, "UPDATE", "NEW")]
    #[case(OperationCode::Delete, 3, "DELETE", "OLD")]
    fn codes_are_frozen(
        #[case] op: OperationCode,
        #[case] code: i64,
        #[case] label: &str,
        #[case] alias: &str,
    ) {
        assert_eq!(op.code(), code);
        assert_eq!(op.label(), label);
        assert_eq!(op.row_alias(), alias);
        assert_eq!(OperationCode::try_from(code).unwrap(), op);
    }

    #[test]
    fn all_is_in_code_order() {
        let codes: Vec<i64> = OperationCode::ALL.iter().map(|op| op.code()).collect();
        assert_eq!(codes, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_code_is_rejected() {
        for code in [0, 4, -1] {
            assert!(matches!(
                OperationCode::try_from(code),
                Err(CoreError::UnknownOperation(c)) if c == code
            ));
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OperationCode::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
        let back: OperationCode = serde_json::from_str("\"update\"").unwrap();
        assert_eq!(back, OperationCode::Update);
    }
}
