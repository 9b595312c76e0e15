pub mod html;
pub mod session;
pub mod sessions;
pub mod state;

pub use session::{FetchOutcome, ViewDeps, ViewSession};
pub use sessions::{SessionError, SessionRepo, DEFAULT_MAX_SESSIONS};
pub use state::{
    SearchPanel, TrendingEntry, TrendingPanel, ViewSnapshot, ViewState, NO_MOVIES_MESSAGE, NO_POSTER_URL,
};
