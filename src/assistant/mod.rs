//! Assistant CLI driver: event decoding, turn assembly, failures, session flow

pub mod failure;
pub mod record;
pub mod session;
pub mod turns;

pub use failure::{extract_status_code, hint_for_status, AssistantFailure};
pub use record::{decode, AssistantRecord, Decoded};
pub use session::{AssistantSession, SessionState};
pub use turns::{DisplayMode, DisplayTurn, Rendered, TurnAssembler};
