mod refresh;
mod session;

pub use refresh::{CookieRefresh, CookieRefresher, RefreshOutcome, TickOutcome};
pub use session::{
    COOKIE_HEADER, ConfigSaver, DEFAULT_USER_AGENT, NoopSaver, Session, SessionConfig,
    USER_AGENT_HEADER, default_headers,
};
