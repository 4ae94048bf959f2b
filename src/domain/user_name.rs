/// Forbidden chars for user names, they end up in HTML emails
const NAME_BLACKLIST: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

/// Display name of a registered user
#[derive(Debug, Clone)]
pub struct UserName(String);

impl UserName {
    /// Parse user name
    pub fn parse(name: String) -> Result<Self, String> {
        let is_empty = name.trim().is_empty();
        let is_too_long = name.chars().count() > 256;
        let contains_blacklisted_chars = name.chars().any(|c| NAME_BLACKLIST.contains(&c));

        if is_empty || is_too_long || contains_blacklisted_chars {
            Err(format!("{name} is not a valid user name"))
        } else {
            Ok(Self(name))
        }
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
