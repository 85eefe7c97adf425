// ABOUTME: ProjectEnv scope pairing a project with a target environment.
// ABOUTME: The delta index watermark and all ownership tags are scoped by it.

use std::fmt;

use super::{StackName, StackNameError};

/// The (project, environment) pair every deployment is scoped to.
///
/// One watermark exists per `ProjectEnv`; stacks it creates carry both
/// values as ownership tags so later runs can find them again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectEnv {
    project: String,
    environment: String,
}

impl ProjectEnv {
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Build the stack name for a template base name within this scope.
    /// A build qualifier, when present, becomes a trailing `-bN` segment.
    pub fn stack_name(&self, base: &str, build: Option<u32>) -> Result<StackName, StackNameError> {
        let name = match build {
            Some(n) => format!("{}-{}-{}-b{}", self.project, base, self.environment, n),
            None => format!("{}-{}-{}", self.project, base, self.environment),
        };
        StackName::new(&name)
    }
}

impl fmt::Display for ProjectEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.environment)
    }
}
