/// Explicit configuration for an analysis run, replacing the ambient
/// global state (`ModuleManager`-adjacent settings) the source engine
/// carried as process-wide defaults.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Hard cap on the work-list's total pop count, guarding against a
    /// pathological traversal that never drains (e.g. a decoder bug that
    /// keeps re-seeding the same region under slightly different modes).
    pub max_worklist_iterations: u64,
    /// Hard cap on basic blocks decoded per `disassemble` call.
    pub max_basic_blocks: u64,
    /// Upper bound on candidate indices enumerated for a single jump
    /// table before giving up, independent of the first-failing-condition
    /// stop rule.
    pub max_jump_table_entries: u32,
    /// Whether `EvaluateVisitor`/`SymbolicVisitor` are allowed to read
    /// concrete values through the `BinaryStream` for unresolved `Memory`
    /// nodes, or must always report them as symbolic.
    pub allow_memory_reads: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_worklist_iterations: 1_000_000,
            max_basic_blocks: 250_000,
            max_jump_table_entries: 4096,
            allow_memory_reads: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_memory_reads() {
        assert!(AnalyzerConfig::default().allow_memory_reads);
    }
}
