use crate::ecs::ComponentId;
use thiserror::Error;

/// Errors raised while building a [`crate::ecs::ComponentRegistry`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("component '{name}' is already registered as id {existing}")]
    DuplicateComponent {
        name: &'static str,
        existing: ComponentId,
    },

    #[error("component name '{name}' is already taken by id {existing}")]
    DuplicateName {
        name: &'static str,
        existing: ComponentId,
    },
}

/// Errors raised while overlaying template properties onto a component.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("component '{component}' does not accept properties")]
    Unsupported { component: &'static str },

    #[error("component '{component}' has no field '{field}'")]
    UnknownField {
        component: &'static str,
        field: String,
    },

    #[error("component '{component}' does not serialize to a JSON object")]
    NotAnObject { component: &'static str },

    #[error("invalid properties for component '{component}'")]
    Invalid {
        component: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading entity templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template document is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("template document must be a JSON object of templates")]
    NotAnObject,

    #[error("template '{template}' is malformed: {reason}")]
    Malformed { template: String, reason: String },
}

/// Errors returned by [`crate::ecs::World`] operations.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("component type '{name}' is not registered with this world")]
    UnregisteredComponent { name: &'static str },

    #[error("component id {id} is not registered with this world")]
    UnknownComponentId { id: ComponentId },

    #[error("template '{template}' references unknown component '{component}'")]
    UnknownComponentName { template: String, component: String },

    #[error("no component registered as '{name}'")]
    UnknownComponent { name: String },

    #[error("no template named '{name}'")]
    UnknownTemplate { name: String },

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("world '{name}' is already initialized")]
    AlreadyInitialized { name: String },
}
