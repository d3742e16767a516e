//! Tokenizer, token cursor and the parsing traits shared by the driver and all back ends.

use std::sync::Arc;

use miette::SourceSpan;

use crate::{AssemblyCode, AssemblyError};

pub mod lexer;
mod stream;
mod token;

pub use lexer::lex;
pub use stream::{Bookmark, TokenStream};
pub use token::{Token, TokenClass};

#[cfg(test)] mod test;

/// Anything that can be primitively parsed from a string into an enum variant. This trait is intended to be derived
/// with the macro from [`retroasm_derive`].
pub trait Parse
where
	Self: Sized,
{
	/// Parse this enum from the lowercased string representation.
	/// # Errors
	/// If the string doesn't correspond with any enum variant.
	fn parse(value: &str, location: SourceSpan, src: Arc<AssemblyCode>) -> Result<Self, Box<AssemblyError>>;

	/// Returns whether this string corresponds with an enum variant; i.e. parsing would succeed.
	fn is_valid(value: &str) -> bool;
}
