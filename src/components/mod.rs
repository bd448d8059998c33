pub mod brush;
pub mod colors;
pub mod grid;
pub mod history;
pub mod selection;
pub mod tools;
