use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::{EmailAddress, UserName};

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 6;

/// Password chosen at registration time
pub struct Password(SecretString);

impl Password {
    /// Parse password, only its length is checked
    pub fn parse(password: SecretString) -> Result<Self, String> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            Err(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ))
        } else {
            Ok(Self(password))
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl ExposeSecret<str> for Password {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

/// User about to be registered
pub struct NewUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub password: Password,
}
