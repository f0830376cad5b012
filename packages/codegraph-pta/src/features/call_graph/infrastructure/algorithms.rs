//! CHA and RTA call resolution
//!
//! - CHA: a virtual call may reach the first definer of the method for the
//!   receiver's declared class and for every subclass.
//! - RTA: as CHA, restricted to classes instantiated in reachable code.

use rustc_hash::FxHashSet;

use crate::features::call_graph::ports::CallGraphAlgorithm;
use crate::shared::models::{InvokeExpr, Method, MethodSignature, Scene, Stmt, Value};

/// Statically bound targets shared by both algorithms
fn resolve_bound(scene: &Scene, invoke: &InvokeExpr) -> Option<Vec<MethodSignature>> {
    match invoke {
        InvokeExpr::Static { method, .. } | InvokeExpr::Special { method, .. } => {
            Some(match scene.method(method) {
                Some(m) => vec![m.signature.clone()],
                None => Vec::new(),
            })
        }
        // No points-to information: function pointers stay unresolved
        InvokeExpr::Pointer { .. } => Some(Vec::new()),
        InvokeExpr::Instance { .. } => None,
    }
}

/// Dispatch targets of `method_name` for the given receiver classes
fn dispatch_targets<'a>(
    scene: &Scene,
    receivers: impl Iterator<Item = &'a str>,
    method_name: &str,
) -> Vec<MethodSignature> {
    let mut targets: Vec<MethodSignature> = receivers
        .filter_map(|class| scene.find_method_in_hierarchy(class, method_name))
        .cloned()
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

/// Class hierarchy analysis
#[derive(Debug, Default)]
pub struct ClassHierarchyAnalysis;

impl CallGraphAlgorithm for ClassHierarchyAnalysis {
    fn name(&self) -> &'static str {
        "cha"
    }

    fn resolve(&self, scene: &Scene, invoke: &InvokeExpr) -> Vec<MethodSignature> {
        if let Some(targets) = resolve_bound(scene, invoke) {
            return targets;
        }
        let Some(method) = invoke.method() else {
            return Vec::new();
        };
        let declared = method.class.as_str();
        let subclasses = scene.all_subclasses(declared);
        dispatch_targets(
            scene,
            std::iter::once(declared).chain(subclasses.into_iter()),
            &method.name,
        )
    }
}

/// Rapid type analysis
#[derive(Debug, Default)]
pub struct RapidTypeAnalysis {
    instantiated: FxHashSet<String>,
}

impl RapidTypeAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_instantiated(&self, class: &str) -> bool {
        self.instantiated.contains(class)
    }
}

impl CallGraphAlgorithm for RapidTypeAnalysis {
    fn name(&self) -> &'static str {
        "rta"
    }

    fn on_method_reached(&mut self, _scene: &Scene, method: &Method) -> bool {
        let Some(body) = &method.body else {
            return false;
        };
        let mut changed = false;
        for (_, stmt) in body.stmts() {
            if let Stmt::Assign {
                rhs: Value::New { class },
                ..
            } = stmt
            {
                changed |= self.instantiated.insert(class.clone());
            }
        }
        changed
    }

    fn resolve(&self, scene: &Scene, invoke: &InvokeExpr) -> Vec<MethodSignature> {
        if let Some(targets) = resolve_bound(scene, invoke) {
            return targets;
        }
        let Some(method) = invoke.method() else {
            return Vec::new();
        };
        let declared = method.class.as_str();
        let subclasses = scene.all_subclasses(declared);
        let receivers = std::iter::once(declared)
            .chain(subclasses.into_iter())
            .filter(|class| self.instantiated.contains(*class));
        dispatch_targets(scene, receivers, &method.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Local, MethodBuilder, SceneBuilder, Type};

    fn animals() -> Scene {
        SceneBuilder::new()
            .class("Animal", None)
            .class("Dog", Some("Animal"))
            .class("Cat", Some("Animal"))
            .class("Poodle", Some("Dog"))
            .method(MethodBuilder::instance("Animal", "speak").build())
            .method(MethodBuilder::instance("Dog", "speak").build())
            .method(MethodBuilder::instance("Cat", "speak").build())
            .build()
    }

    fn speak_on(class: &str) -> InvokeExpr {
        InvokeExpr::Instance {
            base: Local::new("a", Type::class(class)),
            method: MethodSignature::new(class, "speak"),
            args: vec![],
        }
    }

    #[test]
    fn test_cha_includes_all_overrides() {
        let targets = ClassHierarchyAnalysis.resolve(&animals(), &speak_on("Animal"));
        assert_eq!(
            targets,
            vec![
                MethodSignature::new("Animal", "speak"),
                MethodSignature::new("Cat", "speak"),
                MethodSignature::new("Dog", "speak"),
            ]
        );

        let from_poodle = ClassHierarchyAnalysis.resolve(&animals(), &speak_on("Poodle"));
        assert_eq!(from_poodle, vec![MethodSignature::new("Dog", "speak")]);
    }

    #[test]
    fn test_rta_filters_uninstantiated() {
        let scene = animals();
        let mut rta = RapidTypeAnalysis::new();
        assert!(rta.resolve(&scene, &speak_on("Animal")).is_empty());

        let main = MethodBuilder::static_fn("Main", "main")
            .new_obj("p", "Poodle")
            .build();
        assert!(rta.on_method_reached(&scene, &main));
        assert!(!rta.on_method_reached(&scene, &main));
        assert!(rta.is_instantiated("Poodle"));

        assert_eq!(
            rta.resolve(&scene, &speak_on("Animal")),
            vec![MethodSignature::new("Dog", "speak")]
        );
    }

    #[test]
    fn test_static_call_to_unknown_method_has_no_target() {
        let invoke = InvokeExpr::Static {
            method: MethodSignature::new("Lib", "missing"),
            args: vec![],
        };
        assert!(ClassHierarchyAnalysis.resolve(&animals(), &invoke).is_empty());
    }
}
