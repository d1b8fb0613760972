//! Person records.
//!
//! A person is the unit of identity in a tree. Dates are carried for
//! display only; no traversal or classification decision reads them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a person.
///
/// Ordering is plain string ordering. Path search uses it to break ties
/// between neighbors, so it must stay stable across builds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PersonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Recorded sex of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person in a family tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,

    /// Display name.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub sex: Sex,

    #[serde(default)]
    pub birth: Option<NaiveDate>,

    #[serde(default)]
    pub death: Option<NaiveDate>,

    #[serde(default)]
    pub living: bool,
}

impl Person {
    /// Creates a person with unknown sex and no dates.
    pub fn new(id: impl Into<PersonId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sex: Sex::Unknown,
            birth: None,
            death: None,
            living: false,
        }
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = sex;
        self
    }

    pub fn with_birth(mut self, date: NaiveDate) -> Self {
        self.birth = Some(date);
        self
    }

    pub fn with_death(mut self, date: NaiveDate) -> Self {
        self.death = Some(date);
        self.living = false;
        self
    }

    pub fn living(mut self, living: bool) -> Self {
        self.living = living;
        self
    }

    /// Name to show, falling back to the id for unnamed records.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}
