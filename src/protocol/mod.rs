mod message;
pub use message::ContentCoding;
pub use message::MessageHead;

mod error;
pub use error::SerializeError;

mod source;
pub use source::BytesSource;
pub use source::Source;
pub use source::SourcePull;
