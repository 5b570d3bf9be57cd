//! Pure scheduling decisions, free of any I/O. Services persist what
//! these functions compute.

pub mod engagement;
pub mod grading;
pub mod intervals;
pub mod plan;
