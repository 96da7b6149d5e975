use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use poke_slo::{errors, errors::WithBacktrace};

use crate::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessLevel {
    Read,
    Write,
    Admin,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = WithBacktrace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(Self::Read),
            "WRITE" => Ok(Self::Write),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(errors::bad_request(&format!(
                "unknown access level {s}"
            ))),
        }
    }
}

#[derive(
    Debug, Default, Clone, PartialEq, Deserialize, Serialize, Validate, FromRow,
)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    #[validate(
        required(message = "Username is required"),
        length(
            min = 1,
            max = 50,
            message = "Username must be from 1 to 50 characters"
        )
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "Token is required"),
        length(min = 1, message = "Token is required")
    )]
    pub token: Option<String>,
    /// Stored as text; anything but the three known levels is kept as-is and
    /// denied every action.
    #[serde(rename = "accessLevel")]
    #[sqlx(rename = "accessLevel")]
    #[validate(
        required(message = "Access Level is required"),
        custom(function = "check_access_level")
    )]
    pub access_level: Option<String>,
}

impl User {
    pub fn new(username: &str, token: &str, level: AccessLevel) -> Self {
        Self {
            id: None,
            username: Some(username.to_owned()),
            token: Some(token.to_owned()),
            access_level: Some(level.as_str().to_owned()),
        }
    }

    /// `None` when the stored level is missing or unrecognized.
    pub fn level(&self) -> Option<AccessLevel> {
        self.access_level.as_deref()?.parse().ok()
    }

    pub fn name(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}

impl Entity for User {
    const NAME: &'static str = "users";
    const TABLE: &'static str = "user";
    const PRIMARY_KEY: &'static str = "id";
    const FIELDS: &'static [&'static str] =
        &["id", "username", "token", "accessLevel"];
    const UNIQUE: &'static [&'static str] = &["token"];

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

fn check_access_level(value: &str) -> Result<(), ValidationError> {
    if value.parse::<AccessLevel>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("isIn");
    err.message =
        Some(Cow::from("Access Level must be one of READ, WRITE, ADMIN"));
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_level_round_trips_through_text() {
        for level in [AccessLevel::Read, AccessLevel::Write, AccessLevel::Admin]
        {
            assert_eq!(level.as_str().parse::<AccessLevel>().unwrap(), level);
        }
        assert!("admin".parse::<AccessLevel>().is_err());
        assert!("".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn unknown_level_is_none() {
        let mut user = User::new("misty", "t0", AccessLevel::Write);
        assert_eq!(user.level(), Some(AccessLevel::Write));
        user.access_level = Some("OWNER".to_owned());
        assert_eq!(user.level(), None);
        user.access_level = None;
        assert_eq!(user.level(), None);
    }

    #[test]
    fn validation() {
        assert!(User::new("brock", "t1", AccessLevel::Read).validate().is_ok());

        let user = User {
            username: Some("x".repeat(51)),
            token: Some(String::new()),
            access_level: Some("ROOT".to_owned()),
            ..Default::default()
        };
        let errs = user.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("token"));
        assert!(
            fields.contains_key("access_level")
                || fields.contains_key("accessLevel")
        );
    }

    #[test]
    fn json_uses_camel_case_level() {
        let user: User = serde_json::from_str(
            r#"{"username":"ash","token":"abc","accessLevel":"ADMIN"}"#,
        )
        .unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.level(), Some(AccessLevel::Admin));
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["accessLevel"], "ADMIN");
    }
}
