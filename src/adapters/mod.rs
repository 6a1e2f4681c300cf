//! Adapter implementations of the port traits.
//!
//! - `live`: real system clock, disk, random ids and the Gemini API.
//! - `recording`: wrap another adapter and capture its calls to a cassette.
//! - `replaying`: serve recorded calls back from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
