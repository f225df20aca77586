use std::fmt;

use serde::{Deserialize, Deserializer};

/// Telegram chat id (numeric).
///
/// Updates normally carry a JSON number, but a numeric string is accepted too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(ChatId(n)),
            Raw::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(ChatId)
                .map_err(|_| serde::de::Error::custom(format!("invalid chat id: {s}"))),
        }
    }
}

/// Opaque Telegram file path returned by `getFile`, valid for a short time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePath(pub String);

/// A git commit sha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSha(pub String);
