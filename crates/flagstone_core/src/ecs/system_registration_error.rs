use thiserror::Error;

/// Errors that can occur while registering a system with the world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{system}' requires unregistered component '{component}'")]
    UnknownComponent { system: String, component: String },
}
