pub mod hierarchy;

pub use hierarchy::{CallSignature, ClassHierarchy};
