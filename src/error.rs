//! Failure kinds for the demo.
//!
//! Every fallible step of setup carries its own variant so the caller can see
//! which stage failed instead of chasing a null handle.

use crate::demo::DemoState;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("SDL initialization failed: {0}")]
    Sdl(String),

    #[error("window creation failed: {0}")]
    Window(#[from] sdl2::video::WindowBuildError),

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("shader program link failed: {0}")]
    ProgramLink(String),

    #[error("GL object allocation failed: {0}")]
    Allocation(String),

    #[error("shader has no active attribute or uniform named `{0}`")]
    MissingLocation(&'static str),

    #[error("image-sharing extension symbol `{0}` is unavailable")]
    MissingExtension(&'static str),

    #[error("eglCreateImageKHR returned no image")]
    ImageCreation,

    #[error("{operation} called in {state:?} state")]
    InvalidState {
        operation: &'static str,
        state: DemoState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_operation_and_state() {
        let err = DemoError::InvalidState {
            operation: "draw",
            state: DemoState::Destroyed,
        };
        assert_eq!(err.to_string(), "draw called in Destroyed state");
    }

    #[test]
    fn missing_extension_names_symbol() {
        let err = DemoError::MissingExtension("eglCreateImageKHR");
        assert!(err.to_string().contains("eglCreateImageKHR"));
    }
}
