//! Storywatch core: pure change detection, state model and run reporting.
mod detect;
mod policy;
mod report;
mod state;
mod story;
mod targets;

pub use detect::{detect, Delta};
pub use policy::{ErrorKind, Policy, FATAL_EXIT_CODE};
pub use report::{AccountReport, AccountStatus, NotificationOutcome, RunReport};
pub use state::{IdentityCache, PersistedState, WatermarkState};
pub use story::{StoryId, StoryItem, UserId};
pub use targets::parse_account_lines;
