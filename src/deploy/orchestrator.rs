// ABOUTME: The deployment orchestrator: ordered apply, rollback, step-back.
// ABOUTME: Reads the watermark fresh per run and advances it one step per success.

use std::path::Path;

use crate::delta::{IndexStore, PendingDeletionSet};
use crate::diagnostics::{self, Diagnostics, Warning};
use crate::gateway::{StackOps, StackRepository, StackRequest};
use crate::tags;
use crate::types::{ProjectEnv, StackIdentity, StackName, StackOperation, StackStatus};
use crate::watch::{StatusWaiter, WatchError};

use super::error::DeployError;
use super::unit::DeploymentUnit;

/// Watermark plus the live stacks owned by a scope, for status reporting.
#[derive(Debug)]
pub struct EnvironmentStatus {
    pub watermark: crate::delta::DeltaIndex,
    pub stacks: Vec<crate::gateway::StackDescription>,
}

/// Drives ordered template files against one (project, environment).
///
/// Files are applied strictly sequentially; each success advances the
/// watermark before the next file is touched, so a failure leaves the
/// stored index exactly at the last completed step. The waiter strategy is
/// fixed at construction.
pub struct Orchestrator<'a, G> {
    repository: &'a StackRepository<G>,
    waiter: &'a dyn StatusWaiter,
    index: &'a dyn IndexStore,
    scope: ProjectEnv,
    build: Option<u32>,
    comment: Option<String>,
    diagnostics: Diagnostics,
}

impl<'a, G: StackOps> Orchestrator<'a, G> {
    pub fn new(
        repository: &'a StackRepository<G>,
        waiter: &'a dyn StatusWaiter,
        index: &'a dyn IndexStore,
        scope: ProjectEnv,
    ) -> Self {
        Self {
            repository,
            waiter,
            index,
            scope,
            build: None,
            comment: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_build(mut self, build: Option<u32>) -> Self {
        self.build = build;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Apply every template with index above the current watermark, in
    /// ascending order. Stops at the first failure; files after it are
    /// never attempted. Returns the identities applied, in order.
    pub async fn apply_outstanding(
        &mut self,
        directory: &Path,
    ) -> Result<Vec<StackIdentity>, DeployError> {
        let current = self.index.get(&self.scope).await?;
        let units = DeploymentUnit::discover(directory)?;
        let outstanding: Vec<DeploymentUnit> = units
            .into_iter()
            .filter(|u| u.index() > current)
            .collect();

        tracing::info!(
            "{}: watermark {}, {} template(s) outstanding",
            self.scope,
            current,
            outstanding.len()
        );

        let mut applied = Vec::new();
        for unit in outstanding {
            let identity = self.apply_unit(&unit).await?;
            self.index.set(&self.scope, unit.index()).await?;
            applied.push(identity);
        }
        Ok(applied)
    }

    /// Delete every applied stack, highest index first, and wind the
    /// watermark back as far as the deletions actually confirmed. Returns
    /// the names confirmed deleted.
    pub async fn rollback(&mut self, directory: &Path) -> Result<Vec<StackName>, DeployError> {
        let current = self.index.get(&self.scope).await?;
        let units = DeploymentUnit::discover(directory)?;
        let owned = self.repository.owned_by(&self.scope).await?;

        let mut pending = PendingDeletionSet::new();
        for unit in units.iter().filter(|u| u.index() <= current) {
            // Update-only files changed an existing stack in place; there
            // is nothing of their own to tear down.
            if unit.update_only() {
                continue;
            }
            let name = self.stack_name(unit)?;
            match owned.iter().find(|d| d.identity.name() == &name) {
                Some(description) => {
                    pending.add(unit.index(), description.identity.clone());
                }
                None => {
                    self.diagnostics.warn(Warning::missing_stack(format!(
                        "no live stack {} for {} at index {}",
                        name,
                        unit.file_name(),
                        unit.index()
                    )));
                }
            }
        }

        self.delete_pending(&mut pending).await
    }

    /// Undo only the single highest-index applied file. For an update-only
    /// file that means decrementing the watermark with no deletion at all;
    /// for a creation the stack is deleted as in a full rollback.
    pub async fn step_back(&mut self, directory: &Path) -> Result<Vec<StackName>, DeployError> {
        let current = self.index.get(&self.scope).await?;
        let units = DeploymentUnit::discover(directory)?;
        let Some(unit) = units
            .iter()
            .filter(|u| u.index() <= current)
            .max_by_key(|u| u.index())
        else {
            tracing::info!("{}: nothing applied, nothing to step back", self.scope);
            return Ok(Vec::new());
        };

        if unit.update_only() {
            self.index.set(&self.scope, unit.index().prev()).await?;
            return Ok(Vec::new());
        }

        let name = self.stack_name(unit)?;
        let description = self.repository.describe(&name).await?;
        let mut pending = PendingDeletionSet::new();
        pending.add(unit.index(), description.identity.clone());

        self.delete_pending(&mut pending).await
    }

    /// Current watermark plus all live stacks owned by the scope.
    pub async fn status(&self) -> Result<EnvironmentStatus, DeployError> {
        let watermark = self.index.get(&self.scope).await?;
        let stacks = self.repository.owned_by(&self.scope).await?;
        Ok(EnvironmentStatus { watermark, stacks })
    }

    fn stack_name(&self, unit: &DeploymentUnit) -> Result<StackName, DeployError> {
        Ok(self.scope.stack_name(unit.base(), self.build)?)
    }

    async fn apply_unit(&mut self, unit: &DeploymentUnit) -> Result<StackIdentity, DeployError> {
        let name = self.stack_name(unit)?;
        let template_body =
            std::fs::read_to_string(unit.path()).map_err(|source| DeployError::TemplateRead {
                path: unit.path().to_path_buf(),
                source,
            })?;
        let parameters = unit.load_parameters(&self.scope, self.build)?;
        let request = StackRequest {
            name: name.clone(),
            template_body,
            parameters,
            tags: tags::ownership_tags(&self.scope, self.build, self.comment.as_deref()),
        };

        let (identity, operation) = if unit.update_only() {
            tracing::info!("updating {} from {}", name, unit.file_name());
            let identity = self.repository.gateway().update(&request).await?;
            self.repository.invalidate(&name);
            (identity, StackOperation::Update)
        } else {
            self.prepare_create(&name).await?;
            tracing::info!("creating {} from {}", name, unit.file_name());
            let identity = self.repository.gateway().create(&request).await?;
            self.repository.invalidate(&name);
            (identity, StackOperation::Create)
        };

        self.wait_diagnosed(&identity, operation).await?;
        Ok(identity)
    }

    /// Pre-create safety checks on the target name. A leftover rollback
    /// carcass is deleted first; anything else live is a hard stop.
    async fn prepare_create(&mut self, name: &StackName) -> Result<(), DeployError> {
        self.repository.invalidate(name);
        let existing = match self.repository.describe(name).await {
            Ok(description) => description,
            Err(crate::gateway::StackError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match existing.status {
            // A rolled-back create left nothing usable behind; clear it out.
            StackStatus::RollbackComplete | StackStatus::RollbackFailed => {
                tracing::info!("removing rolled-back remnant {}", existing.identity);
                self.delete_and_wait(&existing.identity).await?;
                Ok(())
            }
            StackStatus::RollbackInProgress => {
                tracing::info!("waiting for rollback of {} to settle", existing.identity);
                match self
                    .waiter
                    .wait_for(&existing.identity, StackOperation::Rollback)
                    .await
                {
                    Ok(_) => {}
                    // A rollback that ends failed still settles; the stack
                    // can and must be deleted either way.
                    Err(WatchError::WrongStatus {
                        actual: StackStatus::RollbackFailed,
                        ..
                    }) => {}
                    Err(e) => return Err(e.into()),
                }
                self.delete_and_wait(&existing.identity).await?;
                Ok(())
            }
            _ => Err(DeployError::DuplicateStack(name.to_string())),
        }
    }

    async fn delete_and_wait(&mut self, identity: &StackIdentity) -> Result<(), DeployError> {
        self.repository.gateway().delete(identity.name()).await?;
        self.repository.invalidate(identity.name());
        self.wait_diagnosed(identity, StackOperation::Delete)
            .await?;
        Ok(())
    }

    /// Issue deletes for every pending entry, highest index first, then
    /// hand the whole set to the waiter's batch wait. The waiter writes
    /// the recomputed watermark as part of settling.
    async fn delete_pending(
        &mut self,
        pending: &mut PendingDeletionSet,
    ) -> Result<Vec<StackName>, DeployError> {
        for entry in pending.iter() {
            tracing::info!("deleting {} (index {})", entry.identity(), entry.delta());
            self.repository
                .gateway()
                .delete(entry.identity().name())
                .await?;
            self.repository.invalidate(entry.identity().name());
        }

        match self
            .waiter
            .wait_for_deletions(pending, self.index, &self.scope)
            .await
        {
            Ok(names) => Ok(names),
            Err(e) => {
                if let WatchError::WrongStatus { identity, .. } = &e {
                    diagnostics::dump_stack_events(self.repository.gateway(), identity.name())
                        .await;
                }
                Err(e.into())
            }
        }
    }

    /// Wait for an operation, dumping the stack's event history before
    /// propagating a wrong-status failure.
    async fn wait_diagnosed(
        &mut self,
        identity: &StackIdentity,
        operation: StackOperation,
    ) -> Result<StackStatus, DeployError> {
        match self.waiter.wait_for(identity, operation).await {
            Ok(status) => Ok(status),
            Err(e) => {
                if matches!(e, WatchError::WrongStatus { .. }) {
                    diagnostics::dump_stack_events(self.repository.gateway(), identity.name())
                        .await;
                }
                Err(e.into())
            }
        }
    }
}
