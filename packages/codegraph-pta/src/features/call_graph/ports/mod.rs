//! Call graph ports
//!
//! Resolution strategy used by the direct (pointer-free) call-graph builder.

use crate::shared::models::{InvokeExpr, Method, MethodSignature, Scene};

/// Direct call resolution strategy (CHA, RTA)
pub trait CallGraphAlgorithm {
    fn name(&self) -> &'static str;

    /// Observe a newly reachable method
    ///
    /// Returns true when the algorithm learned something that can change
    /// earlier virtual-call resolutions.
    fn on_method_reached(&mut self, _scene: &Scene, _method: &Method) -> bool {
        false
    }

    /// Possible targets of a call, sorted and deduplicated
    fn resolve(&self, scene: &Scene, invoke: &InvokeExpr) -> Vec<MethodSignature>;
}
