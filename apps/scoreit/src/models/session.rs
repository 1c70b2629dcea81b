use serde::{Deserialize, Serialize};

/// Which browser-local storage scope a session lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Survives restarts ("remember me").
    Durable,
    /// Dies with the tab / shell / process.
    Ephemeral,
}

impl Scope {
    pub fn from_remember_me(remember: bool) -> Self {
        if remember {
            Scope::Durable
        } else {
            Scope::Ephemeral
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Durable => write!(f, "durable"),
            Scope::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub is_google_user: bool,
}

/// Per-user preferences owned by the backend.
/// The copy cached next to a session may be stale and never gates authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default, deserialize_with = "model_id::deserialize")]
    pub model_preference: Option<String>,
}

/// Partial profile update sent as `update_data`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "model_id::serialize"
    )]
    pub model_preference: Option<String>,
}

/// The backend stores model ids as integers; the catalogue hands them out as strings.
mod model_id {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawId>::deserialize(deserializer)?;
        Ok(raw.and_then(|id| match id {
            RawId::Number(n) => Some(n.to_string()),
            RawId::Text(s) if s.trim().is_empty() => None,
            RawId::Text(s) => Some(s.trim().to_string()),
        }))
    }

    pub fn serialize<S>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match id.as_deref().map(|s| (s, s.parse::<i64>())) {
            Some((_, Ok(n))) => serializer.serialize_i64(n),
            Some((s, Err(_))) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.dark_mode.is_none() && self.model_preference.is_none()
    }

    /// Applies this update on top of a cached profile.
    pub fn apply_to(&self, profile: &Profile) -> Profile {
        Profile {
            dark_mode: self.dark_mode.unwrap_or(profile.dark_mode),
            model_preference: self
                .model_preference
                .clone()
                .or_else(|| profile.model_preference.clone()),
        }
    }
}

/// What one storage scope physically holds. The scope itself is not stored:
/// it is implied by which storage the record was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserInfo,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// The logical "current session" view resolved by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub scope: Scope,
    pub user: UserInfo,
    pub profile: Option<Profile>,
}

impl Session {
    pub fn from_stored(stored: StoredSession, scope: Scope) -> Self {
        Self {
            token: stored.token,
            scope,
            user: stored.user,
            profile: stored.profile,
        }
    }
}
