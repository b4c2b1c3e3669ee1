//! Engine configuration

/// Which memory resource backs invocation results by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultMemory {
    /// The engine's scratch arena (rewinds when every result is released)
    #[default]
    Scratch,
    /// The global allocator
    System,
}

/// Engine options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Register primitive types and their operators at construction
    pub register_builtins: bool,

    /// First chunk size of the scratch arena, in bytes
    pub scratch_chunk_size: usize,

    /// Default memory for invocation results
    pub result_memory: ResultMemory,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            register_builtins: true,
            scratch_chunk_size: 16 * 1024, // 16 KB
            result_memory: ResultMemory::Scratch,
        }
    }
}

impl EngineOptions {
    /// Options with nothing pre-registered
    pub fn bare() -> Self {
        Self {
            register_builtins: false,
            ..Self::default()
        }
    }
}
