pub mod span;
pub mod tree;
