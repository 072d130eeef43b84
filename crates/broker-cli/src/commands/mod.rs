pub mod lifecycle;
pub mod logging;
pub mod validate;
