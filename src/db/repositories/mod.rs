pub mod backgrounds;
pub mod sessions;
pub mod sounds;

pub use backgrounds::write_background_flags;
pub use sounds::write_sound_flags;
