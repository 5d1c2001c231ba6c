pub mod catalog;
pub mod line_item;
pub mod quote;
