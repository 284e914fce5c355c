use crate::error::{IdentityError, Result};
use crate::models::{Credentials, NewAccount, ResendRequest};

/// Basic `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // domain needs at least two non-empty labels
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn require_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(IdentityError::validation("Missing required field: email"));
    }
    if !is_valid_email(email) {
        return Err(IdentityError::validation("Invalid email address"));
    }
    Ok(())
}

fn require_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(IdentityError::validation("Missing required field: password"));
    }
    Ok(())
}

pub fn validate_signup(request: &NewAccount) -> Result<()> {
    require_email(&request.email)?;
    require_password(&request.password)
}

pub fn validate_credentials(request: &Credentials) -> Result<()> {
    require_email(&request.email)?;
    require_password(&request.password)
}

pub fn validate_resend(request: &ResendRequest) -> Result<()> {
    require_email(&request.email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email(" first.last@mail.example.org "));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x..com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn signup_requires_password() {
        let request = NewAccount {
            email: "a@x.com".to_string(),
            password: String::new(),
            name: None,
        };
        assert!(matches!(validate_signup(&request), Err(IdentityError::Validation(_))));
    }
}
