use std::fmt;

/// Notifications fanned out to a session's subscribers.
///
/// The wire form is the opaque text produced by `Display`; clients match on
/// the prefix before `:` and re-query full state for anything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    PlayerJoined,
    PlayerLeft,
    RoundStarting,
    PlayerVoted { player: String },
    AllVoted,
    Reveal,
    UserStoryAdded { story: String },
    UserStoryRemoved { index: usize },
    TaskAdded { index: usize },
    /// Bare companion of `TaskAdded` for clients that only refresh the task list.
    TaskListChanged,
    StoryAdded,
    StoryRemoved,
}

impl SessionEvent {
    /// Event name without payload, used for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined => "player-joined",
            Self::PlayerLeft => "player-left",
            Self::RoundStarting => "starting",
            Self::PlayerVoted { .. } => "player-voted",
            Self::AllVoted => "all-voted",
            Self::Reveal => "reveals",
            Self::UserStoryAdded { .. } => "userstory-added",
            Self::UserStoryRemoved { .. } => "userstory-removed",
            Self::TaskAdded { .. } | Self::TaskListChanged => "task-added",
            Self::StoryAdded => "story-added",
            Self::StoryRemoved => "story-removed",
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerVoted { player } => write!(f, "{}:{player}", self.kind()),
            Self::UserStoryAdded { story } => write!(f, "{}:{story}", self.kind()),
            Self::UserStoryRemoved { index } | Self::TaskAdded { index } => {
                write!(f, "{}:{index}", self.kind())
            }
            _ => f.write_str(self.kind()),
        }
    }
}
