use crate::arch::Architecture;
use crate::document::Document;
use crate::error::Result;

/// Parses a container format and declares memory areas, entry points, and
/// initial labels. An external collaborator: no concrete implementation
/// ships in this crate.
pub trait Loader: Send + Sync {
    /// One-time setup (format sniffing, header validation) before `map`.
    fn configure(&mut self) -> Result<()>;

    /// Narrows a candidate architecture list to the ones this format can
    /// actually run under (e.g. an ELF's `e_machine` field), and lets the
    /// loader adjust any per-architecture configuration it needs.
    fn filter_and_configure_architectures(&self, candidates: &[&dyn Architecture]) -> Vec<usize>;

    /// Inserts `MemoryArea`s and seed labels (entry point, exports,
    /// imports) into `document`.
    fn map(&self, document: &Document) -> Result<()>;

    /// Picks the architecture this loader's format declares as primary.
    fn main_architecture<'a>(&self, candidates: &[&'a dyn Architecture]) -> Option<&'a dyn Architecture>;
}
