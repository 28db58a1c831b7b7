pub mod traits;

pub use traits::{ImportSink, PlaylistSource, VideoSearch};
