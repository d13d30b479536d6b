pub mod events;
pub mod ids;
pub mod model;

pub use events::SessionEvent;
pub use ids::{SessionId, SubscriberId};
pub use model::{Round, RoundNumber, Session};
