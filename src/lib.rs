//! vipp2dfa - Xerox VIPP to Papyrus DocDEF converter
//!
//! This library provides functionality to:
//! - Tokenize and parse VIPP database masters (`.dbm`) and forms (`.frm`)
//! - Resolve font and color alias conflicts across a project
//! - Generate DocDEF (`.dfa`) programs for documents and their sub-forms
//! - Convert single files or whole directory trees in parallel

pub mod batch;
pub mod cli;
pub mod command;
pub mod config;
pub mod generator;
pub mod lexer;
pub mod models;
pub mod parser;
pub mod resolver;
pub mod resources;
pub mod structure;
