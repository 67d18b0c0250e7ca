pub mod background;
pub mod session;
pub mod sound;

pub use background::BackgroundAsset;
pub use session::{SessionRecord, SessionStatus};
pub use sound::SoundAsset;
