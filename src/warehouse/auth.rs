use std::str::FromStr;

#[derive(Clone)]
pub enum Auth {
    /// Send an OAuth access token as a Bearer Authorization header
    Bearer(String),
    /// Don't use any authentication (local emulators)
    None,
}

impl Auth {
    pub fn new(r#type: &AuthType, token: Option<String>) -> Self {
        match (r#type, token) {
            (AuthType::Bearer, Some(token)) => Self::Bearer(token),
            (AuthType::None, _) | _ => Self::None,
        }
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => write!(f, "Bearer"),
            Self::None => write!(f, "None"),
        }
    }
}

// Tokens never reach logs
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthType {
    Bearer,
    None,
}

impl FromStr for AuthType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}
