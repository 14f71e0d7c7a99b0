use crate::address::Address;

/// Every failure mode the core reports. None of these are fatal: the
/// analyzer and symbolic executor treat each as a local dead end and the
/// caller decides whether to stop (see `DESIGN.md`, "error handling").
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("address {0} is not mapped by any memory area")]
    UnmappedAddress(Address),

    #[error("cell at {at} would overlap an existing cell of length {existing_len}")]
    CellOverlap { at: Address, existing_len: u32 },

    #[error("failed to decode an instruction at {0}")]
    DecodeFailure(Address),

    #[error("decoder reported a zero-length instruction at {0}")]
    ZeroLengthInstruction(Address),

    #[error("memory area at {0} is not executable")]
    NotExecutable(Address),

    #[error("{0} is an imported boundary and cannot be entered")]
    ImportedBoundary(Address),

    #[error("no architecture backend is registered for the cell at {0}")]
    NoArchitectureForCell(Address),

    #[error("division by zero while evaluating an expression")]
    DivisionByZero,

    #[error("read of {requested} bytes at offset {offset} is out of range (stream size {size})")]
    ReadOutOfRange {
        offset: u64,
        requested: u64,
        size: u64,
    },

    #[error("label {0:?} already exists and Force was not set")]
    DuplicateLabel(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
