use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::row::Row;
use uuid::Uuid;

use super::ParseEnumError;
use crate::db::PgRow;
use crate::store::StoreError;

/// Closed set of authorization roles. The role is the only authorization signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Officer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Officer => "officer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "officer" => Ok(Self::Officer),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolYear {
    Freshman,
    Sophomore,
    Junior,
    Senior,
}

impl SchoolYear {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Freshman => "freshman",
            Self::Sophomore => "sophomore",
            Self::Junior => "junior",
            Self::Senior => "senior",
        }
    }
}

impl FromStr for SchoolYear {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freshman" => Ok(Self::Freshman),
            "sophomore" => Ok(Self::Sophomore),
            "junior" => Ok(Self::Junior),
            "senior" => Ok(Self::Senior),
            _ => Err(ParseEnumError::new("school year", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub school_year: Option<SchoolYear>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let school_year: Option<String> = row.try_get("school_year")?;
        let role: String = row.try_get("role")?;

        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            school_year: school_year.as_deref().map(SchoolYear::from_str).transpose()?,
            role: role.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Validated input for creating a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub school_year: Option<SchoolYear>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterProfileRequest {
    #[serde(default)]
    pub full_name: String,
    pub school_year: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub role: String,
}
