//! Concrete syntax tree input contract.

pub mod cst;
