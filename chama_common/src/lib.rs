mod cents;

pub mod helpers;
pub mod op;
mod secret;

pub use cents::{major_units, Cents, CentsConversionError, CURRENCY_CODE};
pub use secret::Secret;
