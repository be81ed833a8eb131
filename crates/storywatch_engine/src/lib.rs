//! Storywatch engine: IO, external collaborators and run orchestration.
mod client;
mod http_client;
mod lists;
mod notify;
mod orchestrate;
mod pacing;
mod persist;
mod resolve;
mod session;
mod state_store;

pub use client::{normalize_story, ClientError, FailureKind, RawStory, StoryClient};
pub use http_client::{ClientSettings, HttpStoryClient};
pub use lists::{load_account_list, ListError};
pub use notify::{Notification, Notifier, NotifyError, SmtpNotifier, SmtpSettings};
pub use orchestrate::{run_batch, ProgressSink, RunContext, RunSettings};
pub use pacing::{Clock, ManualClock, Pacer, PacingPolicy, RateWindow, TokioClock};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use resolve::{resolve_targets, ResolveError, ResolvedTarget};
pub use session::{login_with_session, Credentials, SessionError, SessionOrigin};
pub use state_store::{load_state, save_state, StateStoreError};
