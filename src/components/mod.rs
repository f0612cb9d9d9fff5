pub mod dialog;
pub mod document;
pub mod menu;
pub mod model_picker;
pub mod status_bar;
pub mod tree;
