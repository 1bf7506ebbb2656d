//! Named entity templates
//!
//! A template lists the components an entity starts with, each with an
//! optional bag of field overrides:
//!
//! ```json
//! {
//!   "Bullet": {
//!     "Position": {},
//!     "Velocity": { "speed": 240.0 }
//!   }
//! }
//! ```
//!
//! Component order inside a template is preserved and is the order in
//! which add commands are queued.

use crate::ecs::{PropertyBag, TemplateError};
use serde_json::Value;
use std::collections::HashMap;

/// One component entry of a template.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSpec {
    pub component: String,
    pub props: PropertyBag,
}

impl ComponentSpec {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            props: PropertyBag::new(),
        }
    }

    pub fn with_props(component: impl Into<String>, props: PropertyBag) -> Self {
        Self {
            component: component.into(),
            props,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntityTemplates {
    templates: HashMap<String, Vec<ComponentSpec>>,
}

impl EntityTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let document: Value = serde_json::from_str(json)?;
        let Value::Object(entries) = document else {
            return Err(TemplateError::NotAnObject);
        };

        let mut templates = Self::new();
        for (name, body) in entries {
            let Value::Object(components) = body else {
                return Err(TemplateError::Malformed {
                    template: name,
                    reason: "expected an object of components".to_string(),
                });
            };
            let mut specs = Vec::with_capacity(components.len());
            for (component, props) in components {
                let props = match props {
                    Value::Object(props) => props,
                    Value::Null => PropertyBag::new(),
                    other => {
                        return Err(TemplateError::Malformed {
                            template: name,
                            reason: format!("properties of '{component}' must be an object, found {other}"),
                        })
                    }
                };
                specs.push(ComponentSpec::with_props(component, props));
            }
            templates.insert(name, specs);
        }
        tracing::debug!(count = templates.len(), "loaded entity templates");
        Ok(templates)
    }

    /// Add or replace a template.
    pub fn insert(&mut self, name: impl Into<String>, components: Vec<ComponentSpec>) {
        self.templates.insert(name.into(), components);
    }

    pub fn get(&self, name: &str) -> Option<&[ComponentSpec]> {
        self.templates.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_templates_in_declaration_order() {
        let templates = EntityTemplates::from_json_str(
            r#"{
                "Ship": { "Velocity": { "speed": 3.0 }, "Position": {}, "Tag": null }
            }"#,
        )
        .unwrap();
        let ship = templates.get("Ship").unwrap();
        let names: Vec<_> = ship.iter().map(|spec| spec.component.as_str()).collect();
        assert_eq!(names, vec!["Velocity", "Position", "Tag"]);
        assert_eq!(ship[0].props["speed"], serde_json::json!(3.0));
        assert!(ship[2].props.is_empty());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            EntityTemplates::from_json_str("[]"),
            Err(TemplateError::NotAnObject)
        ));
        assert!(matches!(
            EntityTemplates::from_json_str(r#"{ "Ship": 3 }"#),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            EntityTemplates::from_json_str(r#"{ "Ship": { "Position": [1, 2] } }"#),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            EntityTemplates::from_json_str("{"),
            Err(TemplateError::Json(_))
        ));
    }

    #[test]
    fn insert_and_lookup() {
        let mut templates = EntityTemplates::new();
        templates.insert("Empty", Vec::new());
        templates.insert("Marker", vec![ComponentSpec::new("Marker")]);
        assert_eq!(templates.len(), 2);
        assert!(templates.get("Empty").unwrap().is_empty());
        assert!(templates.contains("Marker"));
        assert!(templates.get("Missing").is_none());
    }
}
