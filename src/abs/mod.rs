//! Thin wrappers over SDL2 and OpenGL: application setup, shader management,
//! mesh handling, textures, and the image-sharing extension.

pub mod app;
pub mod eglimage;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use app::*;
pub use eglimage::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
