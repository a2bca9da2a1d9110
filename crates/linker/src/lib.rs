//! `rivet-linker` is the linking pipeline: front-end parsing into an
//! intermediate representation, symbol resolution with archive demand
//! loading, section merging and image layout, and architecture-specific
//! relocation.
//!
//! The pipeline is synchronous and single-threaded; callers hand it
//! named byte slices (see `rivet-file`) and get back a laid-out,
//! fully relocated [`image::Image`].

pub mod backend;
pub mod backends;
mod context;
pub mod diag;
mod driver;
mod error;
pub mod frontend;
pub mod frontends;
pub mod image;
pub mod ir;

pub use context::Context;
pub use driver::{LayoutOptions, LinkOutput, Linker};
pub use error::Error;
