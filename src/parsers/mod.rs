pub mod outfile;
pub mod token;

pub use outfile::{
    parse_outputs, parse_outputs_with, ParseOptions, ParsedSentence, SentenceId, Sentences,
};
pub use token::{TokenField, TokenRecord};
