use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ParseEnumError;

/// Review lifecycle tag shared by submissions and documents.
///
/// `UnderReview` is only valid for documents; submissions use the flat
/// pending/approved/rejected machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a competition submission may carry this status.
    pub fn is_submission_status(self) -> bool {
        !matches!(self, Self::UnderReview)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "under_review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseEnumError::new("status", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Approved ".parse::<ReviewStatus>().unwrap(), ReviewStatus::Approved);
        assert_eq!("under_review".parse::<ReviewStatus>().unwrap(), ReviewStatus::UnderReview);
        assert!("archived".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn under_review_is_document_only() {
        assert!(ReviewStatus::Pending.is_submission_status());
        assert!(ReviewStatus::Rejected.is_submission_status());
        assert!(!ReviewStatus::UnderReview.is_submission_status());
    }
}
