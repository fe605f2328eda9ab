use thiserror::Error;

/// Errors raised while turning a scene description into a runnable viewer.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("<{tag}> tag is missing")]
    MissingTag { tag: &'static str },

    #[error("<{tag}> expects {expected} numeric components, got `{value}`")]
    Components {
        tag: String,
        expected: usize,
        value: String,
    },

    #[error("failed to parse <{tag}> value `{value}` as a number")]
    Number { tag: String, value: String },

    #[error("unknown object type `{0}`")]
    UnknownType(String),

    #[error("object `{0}` of type model needs a <mesh> path")]
    MissingMesh(String),

    #[error("unknown key name `{0}`")]
    UnknownKey(String),
}
