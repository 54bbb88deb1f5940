//! Typed error definitions for reorg.
//! Validation and structural failures are raised synchronously from the tree;
//! filesystem failures are recorded per operation by the executor instead.

use thiserror::Error;

use crate::tree::NodeId;

/// A proposed node name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name contains invalid characters: {0:?}")]
    InvalidCharacters(String),

    #[error("Name is reserved on this platform: {0:?}")]
    ReservedName(String),
}

impl NameError {
    pub fn code(&self) -> &'static str {
        match self {
            NameError::EmptyName => "EMPTY_NAME",
            NameError::InvalidCharacters(_) => "INVALID_CHARACTERS",
            NameError::ReservedName(_) => "RESERVED_NAME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path escapes its root: {0}")]
    PathEscapesRoot(String),
}

impl PathError {
    pub fn code(&self) -> &'static str {
        match self {
            PathError::PathEscapesRoot(_) => "PATH_ESCAPES_ROOT",
        }
    }
}

/// Structural and validation failures of tree mutations.
/// A mutation that returns one of these has left the tree untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Target is not a folder: {0}")]
    TargetNotAFolder(NodeId),

    #[error("Folder {0} is an atomic environment and cannot hold staged children")]
    AtomicFolder(NodeId),

    #[error("Cannot move {id} into itself or one of its descendants ({target})")]
    CannotMoveIntoDescendant { id: NodeId, target: NodeId },

    #[error("The root node cannot be moved")]
    CannotMoveRoot,

    #[error("The root node cannot be deleted")]
    CannotDeleteRoot,

    #[error("A file named {name:?} already exists in {parent}")]
    NameAlreadyExists { name: String, parent: NodeId },

    #[error("Node id already in use: {0}")]
    IdAlreadyExists(NodeId),

    #[error(transparent)]
    InvalidName(#[from] NameError),
}

impl TreeError {
    pub fn code(&self) -> &'static str {
        match self {
            TreeError::NodeNotFound(_) => "NODE_NOT_FOUND",
            TreeError::TargetNotAFolder(_) => "TARGET_NOT_A_FOLDER",
            TreeError::AtomicFolder(_) => "ATOMIC_FOLDER",
            TreeError::CannotMoveIntoDescendant { .. } => "CANNOT_MOVE_INTO_DESCENDANT",
            TreeError::CannotMoveRoot => "CANNOT_MOVE_ROOT",
            TreeError::CannotDeleteRoot => "CANNOT_DELETE_ROOT",
            TreeError::NameAlreadyExists { .. } => "NAME_ALREADY_EXISTS",
            TreeError::IdAlreadyExists(_) => "ID_ALREADY_EXISTS",
            TreeError::InvalidName(e) => e.code(),
        }
    }
}

/// Failure while applying a path-addressed edit script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit #{index}: no node at path {path:?}")]
    PathNotFound { index: usize, path: String },

    #[error("edit #{index}: nothing to {action}")]
    EmptyHistory { index: usize, action: &'static str },

    #[error("edit #{index}: {source}")]
    Tree {
        index: usize,
        #[source]
        source: TreeError,
    },
}

impl EditError {
    pub fn code(&self) -> &'static str {
        match self {
            EditError::PathNotFound { .. } => "PATH_NOT_FOUND",
            EditError::EmptyHistory { .. } => "EMPTY_HISTORY",
            EditError::Tree { source, .. } => source.code(),
        }
    }
}
