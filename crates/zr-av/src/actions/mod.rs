//! Encoder actions.

mod zoompan;

pub use zoompan::{render_zoompan, zoompan_args};
