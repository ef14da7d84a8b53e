use hwdb_types::BranchIdError;

/// Failures of a single store operation. A failed operation leaves the store
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("cannot add {kind} {key}: {parent} {parent_key} does not exist")]
    MissingParent {
        kind: &'static str,
        key: String,
        parent: &'static str,
        parent_key: String,
    },
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },
    #[error(transparent)]
    BranchId(#[from] BranchIdError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
