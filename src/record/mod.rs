//! Work records for the ledger.
//!
//! A record is a hybrid document: a structured metadata block followed by a
//! free-form Markdown body. This module owns the record aggregate and its
//! closed enumerations ([`domain`]), the on-disk document format ([`codec`]),
//! and the body scaffolds used when new records are created
//! ([`template`]).

pub mod codec;
pub mod domain;
pub mod template;

#[cfg(test)]
mod tests;
