pub mod prefix;
pub mod recording;
