//! # GMP Wire Format
//!
//! Everything that knows what the Greenbone Management Protocol looks like on
//! the wire. No I/O happens here:
//!
//! * [`xml`]: the owned node tree and stream framing.
//! * [`commands`]: request builders.
//! * [`response`]: envelope and status classification.
//! * [`parse`]: strict response-to-entity parsers.

pub mod commands;
pub mod parse;
pub mod response;
pub mod xml;

pub use xml::{XmlError, XmlNode};
