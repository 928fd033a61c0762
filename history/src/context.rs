use strata_core::{CoreObject, ObjectId};

/// Resolves live objects for operations being applied or reverted.
///
/// Operations capture the object they were recorded against, but re-resolve
/// it by id from the tracked root before replaying, so an object that was
/// re-inserted into the graph is still found. The captured handle is used
/// only when the object is no longer reachable from the root.
#[derive(Debug, Clone)]
pub struct OperationExecutionContext {
    root: CoreObject,
}

impl OperationExecutionContext {
    pub fn new(root: CoreObject) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &CoreObject {
        &self.root
    }

    /// Finds an object reachable from the root by id.
    pub fn find_object(&self, id: ObjectId) -> Option<CoreObject> {
        self.root.find(id)
    }

    /// The live instance of `captured`, falling back to `captured` itself.
    pub fn resolve(&self, captured: &CoreObject) -> CoreObject {
        self.find_object(captured.id())
            .unwrap_or_else(|| captured.clone())
    }
}
