use serde::{Deserialize, Serialize};

use super::UserRecord;

/// Access and refresh token issued together by login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both tokens must be present for the pair to be stored.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Tokens currently held by the credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserRecord,
}

impl LoginResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"access_token":"A","refresh_token":"R","user":{"id":1,"role":"admin"}}"#;
        let login: LoginResponse = serde_json::from_str(json).expect("Failed to parse login JSON");

        assert_eq!(login.tokens(), TokenPair::new("A", "R"));
        assert_eq!(login.user.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_token_pair_completeness() {
        assert!(TokenPair::new("a", "r").is_complete());
        assert!(!TokenPair::new("", "r").is_complete());
        assert!(!TokenPair::new("a", "").is_complete());
    }

    #[test]
    fn test_refresh_body_missing_field_is_rejected() {
        let result = serde_json::from_str::<TokenPair>(r#"{"access_token":"A"}"#);
        assert!(result.is_err());
    }
}
