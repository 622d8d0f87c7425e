pub mod error;
pub mod event;
pub mod http;

pub use error::{CodecError, Result};
pub use event::{Event, SPEC_VERSION};
pub use http::{decode, encode, ContentMode, EncodedEvent, STRUCTURED_CONTENT_TYPE};
