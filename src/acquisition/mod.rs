//! Raw record acquisition
//!
//! Turns the lines a telescope's counting board writes into clock samples and
//! GPS reference records.

pub mod hex_decoder;

pub use hex_decoder::{
    decode_record, decode_stream, DecodeError, DecodeFailure, DecodedRecord, DecodedStream,
    ReferenceRecord,
};
