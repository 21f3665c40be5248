pub mod catalog;
pub mod rules;
pub mod scorer;
pub mod selector;
