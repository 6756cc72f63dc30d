use super::context::CallContext;

/// One queued unit of registry-affecting work.
///
/// Created by a gateway operation, consumed exactly once by the call
/// runner. The closure carries its own result channel, so executing the
/// unit is all that is needed to answer the waiting caller.
pub struct CallUnit {
    op: &'static str,
    func: Box<dyn FnOnce(&mut CallContext) + Send>,
}

impl CallUnit {
    pub fn new<F>(op: &'static str, func: F) -> Self
    where
        F: FnOnce(&mut CallContext) + Send + 'static,
    {
        Self {
            op,
            func: Box::new(func),
        }
    }

    /// Operation label, used for logging and metrics.
    pub fn op(&self) -> &'static str {
        self.op
    }

    pub(crate) fn execute(self, context: &mut CallContext) {
        (self.func)(context);
    }
}

impl std::fmt::Debug for CallUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallUnit").field("op", &self.op).finish()
    }
}
