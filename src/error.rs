//! Error types for spgemm3d

use thiserror::Error;

/// Result type alias using the crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the distributed operations
///
/// Errors that stem from collective state (dimension checks, the memory
/// budget) are computed from values every rank agrees on, so all members of a
/// group return the same error and the group unwinds together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Inner dimensions of a multiplication do not agree
    #[error("Can not multiply, dimensions do not match: {a_cols} != {b_rows}")]
    DimensionMismatch {
        /// Columns of the left operand
        a_cols: usize,
        /// Rows of the right operand
        b_rows: usize,
    },

    /// The per-process memory budget is already used up by inputs and outputs
    #[error("Per-process memory budget exhausted before the first phase ({remaining} bytes left)")]
    MemoryBudgetExceeded {
        /// Remaining budget after the fixed input/output memory
        remaining: i64,
    },

    /// The process count does not factor into the requested grid
    #[error("Can not arrange {processes} processes into {detail}")]
    InvalidGrid {
        /// Size of the world group
        processes: usize,
        /// Requested arrangement
        detail: String,
    },

    /// The special distribution needs a perfect-square layer count
    #[error("Special distribution requires a perfect-square layer count, got {layers}")]
    InvalidLayerCount {
        /// Requested number of layers
        layers: usize,
    },

    /// Two operands live on incompatible process grids
    #[error("Process grids do not match: {0}")]
    GridMismatch(String),

    /// A peer of an in-process group dropped its end of a channel
    #[error("Lost connection to peer {peer}")]
    Disconnected {
        /// Rank of the peer inside the group
        peer: usize,
    },

    /// A received message did not carry the expected payload type
    #[error("Unexpected payload type received from peer {peer}")]
    PayloadType {
        /// Rank of the sender inside the group
        peer: usize,
    },

    /// A member was left without a subgroup when its group was split
    #[error("Splitting by color {color} produced no subgroup")]
    SplitFailed {
        /// Color the member asked for
        color: usize,
    },

    /// A variable-size exchange received a different amount than announced
    #[error("Peer {peer} announced {expected} items but sent {got}")]
    CountMismatch {
        /// Rank of the sender inside the group
        peer: usize,
        /// Count announced in the size phase
        expected: usize,
        /// Count actually delivered
        got: usize,
    },

    /// The root of a broadcast did not provide a value
    #[error("Broadcast root {root} has no value to send")]
    MissingRootValue {
        /// Rank of the root inside the group
        root: usize,
    },

    /// A simulated process panicked
    #[error("Process {rank} panicked")]
    ProcessPanicked {
        /// World rank of the failed process
        rank: usize,
    },
}
