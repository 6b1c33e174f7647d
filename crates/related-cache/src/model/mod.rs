//! Model Module - record interface, primary keys and relationship slots

pub mod primary_key;
pub mod record;
pub mod slots;

pub use primary_key::*;
pub use record::*;
pub use slots::*;
