//! Audio helpers for playing synthesized speech on a local output device.

pub mod audio;
pub mod device;
pub mod playback;

pub use playback::play_blocking;
