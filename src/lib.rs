//! Converts biographical profile `.docx` files into JSON records by classifying paragraphs
//! against a declarative rule table.

pub mod docx;
pub mod pipeline;
pub mod textutil;
