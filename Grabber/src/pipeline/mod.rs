//! Pipeline entry points for grabber operations.
//!
//! - `Grabber`: per-URL service calls returning `ServiceResponse`
//! - `run_grabber`: fetch and download a list of URLs into the output directory

pub mod grab;

pub use grab::{GrabbedPost, Grabber, run_grabber};
