use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::SessionId;

const ROUND_PREFIX: &str = "round-";

/// Position of a round within its session, starting at 1.
///
/// Only formatted as `round-<N>` at the boundary (JSON, URLs).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoundNumber(u32);

impl RoundNumber {
    pub const FIRST: Self = Self(1);

    pub fn new(n: u32) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Parse a `round-<N>` label. Anything else is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        label
            .strip_prefix(ROUND_PREFIX)?
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROUND_PREFIX}{}", self.0)
    }
}

impl Serialize for RoundNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoundNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid round id: {raw}")))
    }
}

/// One voting cycle. Absence of a player key means that player has not voted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundNumber,
    #[serde(default)]
    pub votes: BTreeMap<String, i64>,
}

impl Round {
    pub fn new(id: RoundNumber) -> Self {
        Self {
            id,
            votes: BTreeMap::new(),
        }
    }
}

/// One planning-poker room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "user_stories", default)]
    pub user_stories: Vec<String>,
    #[serde(default)]
    pub tasks: BTreeMap<usize, String>,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<Round>,
    #[serde(default)]
    pub round_history: Vec<Round>,
    /// Highest round number ever issued in this session.
    #[serde(default)]
    pub last_round: u32,
    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(id: SessionId, name: impl Into<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id,
            name: name.into(),
            user_stories: Vec::new(),
            tasks: BTreeMap::new(),
            players: Vec::new(),
            current_round: None,
            round_history: Vec::new(),
            last_round: 0,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn next_round_number(&self) -> RoundNumber {
        let current = self.current_round.as_ref().map_or(0, |r| r.id.get());
        RoundNumber(self.last_round.max(current)).next()
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p == name)
    }
}
