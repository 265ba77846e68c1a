//! Script encoder abstraction for the veil post-build obfuscator.
//!
//! The character-subset encoding itself lives outside this workspace. This
//! crate only defines the boundary the pipeline talks to:
//!
//! - [`Encoder`] trait turning script text into an equivalent obfuscated program
//! - [`CommandEncoder`] delegating to an external program over stdin/stdout
//! - [`MockEncoder`] reversible stub for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use veil_encoder::{CommandEncoder, Encoder};
//!
//! let encoder = CommandEncoder::new("jscrewit", Vec::new());
//! let obfuscated = encoder.encode("console.log(1)")?;
//! ```

mod command;
mod encoder;
#[cfg(feature = "mock")]
mod mock;

pub use command::CommandEncoder;
pub use encoder::{EncodeError, Encoder};
#[cfg(feature = "mock")]
pub use mock::{MOCK_ALPHABET, MockEncoder};
