use crate::address::Address;
use crate::arch::Architecture;
use crate::document::Document;
use crate::error::Result;
use crate::loader::Loader;

/// Seeds CPU/memory context and identifies imports for a given
/// architecture/loader pairing. An external collaborator: no concrete
/// implementation ships in this crate.
pub trait OperatingSystem: Send + Sync {
    fn initialize_cpu_context(&self, document: &Document, architecture: &dyn Architecture) -> Result<()>;

    fn initialize_memory_context(&self, document: &Document) -> Result<()>;

    fn is_supported(&self, loader: &dyn Loader, architecture: &dyn Architecture) -> bool;

    /// Annotates the document with OS-specific metadata (import table
    /// names, calling convention hints) once the loader has mapped areas.
    fn provide_details(&self, document: &Document) -> Result<()>;

    /// Performs OS-specific analysis of the function starting at
    /// `address` (e.g. recognizing a known libc prologue).
    fn analyze_function(&self, document: &Document, address: Address) -> Result<()>;
}
