//! Scene: the whole program as seen by the analyses
//!
//! Holds classes and methods and answers class-hierarchy queries. Built either
//! with [`SceneBuilder`](super::builder::SceneBuilder) or loaded from JSON.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::cfg::Method;
use super::ir::MethodSignature;
use crate::errors::Result;

/// Class declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub super_class: Option<String>,
    /// Declaring file (used for SDK detection)
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Class {
    pub fn new(name: impl Into<String>, super_class: Option<String>) -> Self {
        Self {
            name: name.into(),
            super_class,
            file: String::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Serialized scene layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub methods: Vec<Method>,
    /// File path prefixes that mark SDK declarations
    #[serde(default)]
    pub sdk_paths: Vec<String>,
}

/// Indexed program
#[derive(Debug, Clone, Default)]
pub struct Scene {
    classes: BTreeMap<String, Class>,
    methods: BTreeMap<MethodSignature, Method>,
    sdk_paths: Vec<String>,
    /// Direct subclasses by superclass name
    subclasses: FxHashMap<String, Vec<String>>,
}

impl From<SceneData> for Scene {
    fn from(data: SceneData) -> Self {
        let mut scene = Scene {
            sdk_paths: data.sdk_paths,
            ..Default::default()
        };
        for class in data.classes {
            scene.insert_class(class);
        }
        for method in data.methods {
            scene.insert_method(method);
        }
        scene
    }
}

impl Scene {
    /// Load a scene from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let data: SceneData = serde_json::from_str(json)?;
        Ok(data.into())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_data(&self) -> SceneData {
        SceneData {
            classes: self.classes.values().cloned().collect(),
            methods: self.methods.values().cloned().collect(),
            sdk_paths: self.sdk_paths.clone(),
        }
    }

    pub(crate) fn insert_class(&mut self, class: Class) {
        if let Some(parent) = &class.super_class {
            let children = self.subclasses.entry(parent.clone()).or_default();
            if !children.contains(&class.name) {
                children.push(class.name.clone());
            }
        }
        self.classes.insert(class.name.clone(), class);
    }

    pub(crate) fn insert_method(&mut self, method: Method) {
        let sig = &method.signature;
        if let Some(class) = self.classes.get_mut(&sig.class) {
            if !class.methods.contains(&sig.name) {
                class.methods.push(sig.name.clone());
            }
        }
        self.methods.insert(sig.clone(), method);
    }

    pub(crate) fn add_sdk_path(&mut self, prefix: impl Into<String>) {
        self.sdk_paths.push(prefix.into());
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    pub fn method(&self, sig: &MethodSignature) -> Option<&Method> {
        self.methods.get(sig)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    /// The class itself followed by its ancestors, nearest first
    ///
    /// Unknown ancestors end the chain; cyclic hierarchies are cut at the
    /// first repeated class.
    pub fn super_chain(&self, name: &str) -> Vec<&Class> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = self.classes.get(name);
        while let Some(class) = current {
            if !seen.insert(class.name.as_str()) {
                break;
            }
            chain.push(class);
            current = class
                .super_class
                .as_deref()
                .and_then(|parent| self.classes.get(parent));
        }
        chain
    }

    /// Direct subclasses
    pub fn subclasses(&self, name: &str) -> &[String] {
        self.subclasses
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All transitive subclasses, excluding the class itself
    pub fn all_subclasses(&self, name: &str) -> Vec<&str> {
        let mut result = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(name);
        let mut stack: Vec<&str> = self.subclasses(name).iter().map(|s| s.as_str()).collect();
        while let Some(class) = stack.pop() {
            if !seen.insert(class) {
                continue;
            }
            result.push(class);
            stack.extend(self.subclasses(class).iter().map(|s| s.as_str()));
        }
        result
    }

    /// Reflexive subclass test
    pub fn is_subclass_of(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        self.super_chain(sub).iter().any(|c| c.name == sup)
    }

    /// First method named `method_name` walking up from `class`
    pub fn find_method_in_hierarchy(
        &self,
        class: &str,
        method_name: &str,
    ) -> Option<&MethodSignature> {
        for c in self.super_chain(class) {
            let sig = MethodSignature::new(c.name.clone(), method_name);
            if let Some((key, _)) = self.methods.get_key_value(&sig) {
                return Some(key);
            }
        }
        // Class unknown to the scene: only an exact declaration matches
        if self.classes.get(class).is_none() {
            let sig = MethodSignature::new(class, method_name);
            return self.methods.get_key_value(&sig).map(|(key, _)| key);
        }
        None
    }

    /// SDK method: flagged explicitly or declared in a file under an SDK path
    pub fn is_sdk_method(&self, sig: &MethodSignature) -> bool {
        if self.methods.get(sig).map(|m| m.sdk).unwrap_or(false) {
            return true;
        }
        match self.classes.get(&sig.class) {
            Some(class) => self
                .sdk_paths
                .iter()
                .any(|prefix| !prefix.is_empty() && class.file.starts_with(prefix.as_str())),
            None => false,
        }
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::builder::{MethodBuilder, SceneBuilder};

    fn hierarchy() -> Scene {
        SceneBuilder::new()
            .class("Animal", None)
            .class("Dog", Some("Animal"))
            .class("Poodle", Some("Dog"))
            .method(MethodBuilder::instance("Animal", "speak").build())
            .method(MethodBuilder::instance("Dog", "speak").build())
            .build()
    }

    #[test]
    fn test_super_chain_and_subclass() {
        let scene = hierarchy();
        let chain: Vec<&str> = scene
            .super_chain("Poodle")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(chain, vec!["Poodle", "Dog", "Animal"]);

        assert!(scene.is_subclass_of("Poodle", "Animal"));
        assert!(scene.is_subclass_of("Dog", "Dog"));
        assert!(!scene.is_subclass_of("Animal", "Dog"));

        let mut subs = scene.all_subclasses("Animal");
        subs.sort();
        assert_eq!(subs, vec!["Dog", "Poodle"]);
    }

    #[test]
    fn test_find_method_first_definer() {
        let scene = hierarchy();
        let sig = scene.find_method_in_hierarchy("Poodle", "speak").unwrap();
        assert_eq!(sig, &MethodSignature::new("Dog", "speak"));
        assert!(scene.find_method_in_hierarchy("Poodle", "fly").is_none());
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let scene = SceneBuilder::new()
            .class("A", Some("B"))
            .class("B", Some("A"))
            .build();
        assert_eq!(scene.super_chain("A").len(), 2);
        assert!(!scene.is_subclass_of("A", "C"));
    }

    #[test]
    fn test_sdk_detection() {
        let scene = SceneBuilder::new()
            .sdk_path("sdk/")
            .class_in_file("Router", None, "sdk/router.d.ts")
            .class_in_file("Page", None, "src/page.ets")
            .method(MethodBuilder::instance("Router", "push").build())
            .method(MethodBuilder::instance("Page", "build").build())
            .build();

        assert!(scene.is_sdk_method(&MethodSignature::new("Router", "push")));
        assert!(!scene.is_sdk_method(&MethodSignature::new("Page", "build")));
    }

    #[test]
    fn test_json_round_trip_keeps_index() {
        let scene = hierarchy();
        let json = serde_json::to_string(&scene.to_data()).unwrap();
        let loaded = Scene::from_json(&json).unwrap();
        assert_eq!(loaded.class_count(), 3);
        assert_eq!(loaded.subclasses("Animal"), &["Dog".to_string()]);
        assert!(loaded
            .method(&MethodSignature::new("Dog", "speak"))
            .is_some());
    }
}
