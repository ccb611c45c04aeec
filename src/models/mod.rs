pub mod record;

pub use record::{Gender, IdentityRecord, RawTranscript, Side};
