//! C front end
//!
//! This module transforms C source files into a typed syntax tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`preprocessor`]: Directives, macro expansion and the preprocessing record
//! - [`parse`]: Parsing (tokens → AST), split over `declarations`,
//!   `statements` and `expressions`
//! - [`sema`]: Scopes, name lookup, redeclaration chains and constant folding
//! - [`ast`]: AST node definitions
//!
//! # Supported C Subset
//!
//! - C99 declarations: typedefs, structs, unions, enums, bit-fields,
//!   pointers, arrays, prototypes and K&R-style empty parameter lists
//! - All statements and expressions, including designated initializers and
//!   compound literals
//! - GNU attributes and `__asm__` labels on declarations
//! - No function pointer or other parenthesized declarators
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
pub mod preprocessor;
pub mod sema;
mod statements;
