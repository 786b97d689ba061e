//! Value objects representing immutable domain concepts.

pub mod phone_number;

pub use phone_number::PhoneNumber;
