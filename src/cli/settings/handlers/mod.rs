//! Setting handlers for different configuration patterns.

pub mod boolean;
pub mod judge;
pub mod model_keyed;
pub mod simple;
pub mod string;

pub use boolean::*;
pub use judge::*;
pub use model_keyed::*;
pub use simple::*;
pub use string::*;
