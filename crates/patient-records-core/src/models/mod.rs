//! Domain models for the patient records store.

mod form;
mod page;
mod patient;

pub use form::*;
pub use page::*;
pub use patient::*;
