use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{User, UserSpreadsheet};
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("username is required"));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("invalid email address"));
        }
        if self.password.len() < 8 {
            return Err(AppError::validation("password must be at least 8 characters"));
        }
        if self.password != self.confirm_password {
            return Err(AppError::validation("passwords do not match"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterSpreadsheetRequest {
    /// A full Google Sheets URL or a bare spreadsheet id.
    pub spreadsheet: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpreadsheetResponse {
    pub spreadsheet_id: String,
    pub spreadsheet_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserSpreadsheet> for SpreadsheetResponse {
    fn from(row: UserSpreadsheet) -> Self {
        SpreadsheetResponse {
            spreadsheet_id: row.spreadsheet_id,
            spreadsheet_name: row.spreadsheet_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: "budi".into(),
            email: "budi@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn accepts_a_well_formed_registration() {
        assert!(request("hunter22", "hunter22").validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_passwords() {
        let err = request("hunter22", "hunter23").validate().unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn rejects_short_passwords_and_bad_emails() {
        assert!(request("seven77", "seven77").validate().is_err());

        let mut bad_email = request("hunter22", "hunter22");
        bad_email.email = "not-an-email".into();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn email_validation_requires_domain_dot() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn remember_me_defaults_to_false() {
        let login: LoginRequest =
            serde_json::from_str(r#"{"username_or_email":"budi","password":"x"}"#).unwrap();
        assert!(!login.remember_me);
    }
}
