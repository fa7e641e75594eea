//! Audio value types shared by the object model.
pub mod formats;
pub mod math;
pub mod spatial;
