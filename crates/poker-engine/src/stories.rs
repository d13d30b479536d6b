use poker_core::{Session, SessionEvent};

use crate::{EngineError, Transition};

pub fn add_story(session: &mut Session, story: &str) -> Transition {
    session.user_stories.push(story.to_owned());
    Transition::mutated(vec![
        SessionEvent::UserStoryAdded {
            story: story.to_owned(),
        },
        SessionEvent::StoryAdded,
    ])
}

/// Remove the story at `index` and that index's task.
///
/// Tasks of later stories keep their old keys, so after removal they point
/// one position past the story they were written for.
pub fn remove_story(session: &mut Session, index: usize) -> Result<Transition, EngineError> {
    check_index(session, index)?;
    session.user_stories.remove(index);
    session.tasks.remove(&index);
    Ok(Transition::mutated(vec![
        SessionEvent::UserStoryRemoved { index },
        SessionEvent::StoryRemoved,
    ]))
}

/// Set the task of the story at `index`, replacing any previous task.
pub fn add_task(session: &mut Session, index: usize, task: &str) -> Result<Transition, EngineError> {
    check_index(session, index)?;
    session.tasks.insert(index, task.to_owned());
    Ok(Transition::mutated(vec![
        SessionEvent::TaskAdded { index },
        SessionEvent::TaskListChanged,
    ]))
}

fn check_index(session: &Session, index: usize) -> Result<(), EngineError> {
    if index >= session.user_stories.len() {
        return Err(EngineError::InvalidInput(format!(
            "story index {index} out of range (have {})",
            session.user_stories.len()
        )));
    }
    Ok(())
}
