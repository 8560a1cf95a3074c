pub mod fits;
pub mod image_io;
pub mod loader;
pub mod writer;
