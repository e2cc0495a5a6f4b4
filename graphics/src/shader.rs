//! Compiled shader programs available to pipelines.
//!
//! The resource loading layer fills the [`ShaderLibrary`] with compiled
//! bytecode before the rendering system initializes; pipelines look their
//! program up by name in [`Pipeline::initialize`](crate::pipeline::Pipeline::initialize).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GraphicsError;
use crate::tables::ShaderStageFlags;

/// A compiled shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    name: String,
    stages: ShaderStageFlags,
    bytecode: Arc<[u8]>,
}

impl ShaderProgram {
    /// Create a program from compiled bytecode.
    pub fn new(
        name: impl Into<String>,
        stages: ShaderStageFlags,
        bytecode: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            stages,
            bytecode: bytecode.into(),
        }
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages the program has entry points for.
    pub fn stages(&self) -> ShaderStageFlags {
        self.stages
    }

    /// Compiled bytecode.
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }
}

/// Collection of compiled shader programs, keyed by name.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    programs: HashMap<String, ShaderProgram>,
}

impl ShaderLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a program, replacing one with the same name.
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] if the program has no
    /// stages or no bytecode.
    pub fn insert(
        &mut self,
        program: ShaderProgram,
    ) -> Result<Option<ShaderProgram>, GraphicsError> {
        if program.stages.is_empty() || program.bytecode.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "shader {} has no stages or no bytecode",
                program.name
            )));
        }
        log::trace!(
            "Registered shader {} ({:?}, {} bytes)",
            program.name,
            program.stages,
            program.bytecode.len()
        );
        Ok(self.programs.insert(program.name.clone(), program))
    }

    /// Look up a program.
    pub fn get(&self, name: &str) -> Result<&ShaderProgram, GraphicsError> {
        self.programs
            .get(name)
            .ok_or_else(|| GraphicsError::ShaderNotFound(name.to_string()))
    }

    /// Returns true if a program with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    /// Number of programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns true if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Program names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.programs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
