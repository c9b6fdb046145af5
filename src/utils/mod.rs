pub mod clipboard;
pub mod editor;
pub mod logging;
pub mod syntax;
pub mod url;
