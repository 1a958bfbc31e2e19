//! Compiler and register-machine interpreter for the Tiny-Extended
//! programming language.
//!
//! The pipeline runs strictly forward: lexer → parser → semantic analyzer →
//! code generator → PM interpreter. Every stage collects its own recoverable
//! errors and refuses to run while the previous stage still holds any.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod semantic;
