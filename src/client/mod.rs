//! Client side of the relay protocol: an async framed connection and the
//! line splitter the interactive front end feeds it from.

pub mod connection;
pub mod lines;

pub use connection::{ChatClient, FrameReader, FrameWriter};
pub use lines::LineSplitter;
