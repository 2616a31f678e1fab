//! Tests for the program model and its builder

mod test_builder;
mod test_types;
mod test_validation;
