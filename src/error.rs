use alloc::format;
use alloc::string::String;
use core::fmt;

/// Error type returned by the fallible surface of [`crate::BPlusTreeMap`].
#[derive(Debug)]
pub enum BPlusTreeError {
    /// A constructor was asked for a capacity too small to hold a valid node.
    InvalidCapacity(String),
    /// `get_item`/`remove_item` found no entry for the given key.
    KeyNotFound,
    /// `bulk_load` was given input that was not strictly increasing by key.
    InvalidBulkLoadInput(String),
    /// A range cursor observed a generation change since it was created.
    ConcurrentMutation,
    /// An internal consistency check (`check_invariants`) failed.
    DataIntegrityError(String),
    /// The tree structure is provably inconsistent (corrupt pointers, etc.).
    CorruptedTree(String),
    /// An operation was attempted in a state that does not support it.
    InvalidState(String),
    /// The global allocator returned null for a node block request.
    AllocationError(String),
}

impl fmt::Display for BPlusTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BPlusTreeError::InvalidCapacity(s) => write!(f, "InvalidCapacity: {}", s),
            BPlusTreeError::KeyNotFound => write!(f, "KeyNotFound"),
            BPlusTreeError::InvalidBulkLoadInput(s) => write!(f, "InvalidBulkLoadInput: {}", s),
            BPlusTreeError::ConcurrentMutation => {
                write!(f, "ConcurrentMutation: tree was mutated since this cursor was created")
            }
            BPlusTreeError::DataIntegrityError(s) => write!(f, "DataIntegrityError: {}", s),
            BPlusTreeError::CorruptedTree(s) => write!(f, "CorruptedTree: {}", s),
            BPlusTreeError::InvalidState(s) => write!(f, "InvalidState: {}", s),
            BPlusTreeError::AllocationError(s) => write!(f, "AllocationError: {}", s),
        }
    }
}

impl core::error::Error for BPlusTreeError {}

impl core::cmp::PartialEq for BPlusTreeError {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}
impl Eq for BPlusTreeError {}

impl BPlusTreeError {
    pub fn invalid_capacity(got: usize, min: usize) -> Self {
        BPlusTreeError::InvalidCapacity(format!(
            "Capacity {} is invalid (minimum required: {})",
            got, min
        ))
    }
    pub fn invalid_bulk_load_input(why: &str) -> Self {
        BPlusTreeError::InvalidBulkLoadInput(format!("{}", why))
    }
    pub fn data_integrity(op: &str, why: &str) -> Self {
        BPlusTreeError::DataIntegrityError(format!("{}: {}", op, why))
    }
    pub fn corrupted_tree(where_: &str, why: &str) -> Self {
        BPlusTreeError::CorruptedTree(format!("{} corruption: {}", where_, why))
    }
    pub fn invalid_state(op: &str, why: &str) -> Self {
        BPlusTreeError::InvalidState(format!("Cannot {}: {}", op, why))
    }
    pub fn allocation_error(what: &str, why: &str) -> Self {
        BPlusTreeError::AllocationError(format!("Failed to allocate {}: {}", what, why))
    }
}

pub type BTreeResult<T> = Result<T, BPlusTreeError>;
pub type KeyResult<T> = Result<T, BPlusTreeError>;
pub type ModifyResult<T> = Result<T, BPlusTreeError>;
