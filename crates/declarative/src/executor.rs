//! Lifecycle host - runs one reconciliation pass per call
//!
//! Each pass refreshes the stored instance through its read hook, plans a
//! [`Change`], runs the hooks for it to completion, and persists the
//! resulting identity and observed state. Passes are strictly sequential;
//! nothing is cached between them except the stored records.

use crate::context::{AutoConfirm, ConfirmCallback, LogProgress, ProgressCallback};
use crate::planner::plan_change;
use crate::resource::Resource;
use crate::state::{InstanceRecord, StateStore};
use crate::types::{ApplyOptions, ApplyResult, ApplySummary, Change, Hook};
use anyhow::{Context, Result, bail};

/// Host driving resource hooks against a state store
pub struct Host<S: StateStore> {
    store: S,
    options: ApplyOptions,
    summary: ApplySummary,
}

impl<S: StateStore> Host<S> {
    /// Create a host over a state store
    pub fn new(store: S) -> Self {
        Self::with_options(store, ApplyOptions::default())
    }

    /// Create a host with explicit options
    pub fn with_options(store: S, options: ApplyOptions) -> Self {
        Self {
            store,
            options,
            summary: ApplySummary::default(),
        }
    }

    /// The underlying state store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Results of all passes run so far
    pub fn summary(&self) -> &ApplySummary {
        &self.summary
    }

    /// Run the read hook for a stored instance
    ///
    /// Returns the bound identity and fresh state, or `None` when nothing is
    /// stored or the read reported the entity gone. In the latter case the
    /// stored identity is cleared.
    pub fn refresh<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        address: &str,
    ) -> Result<Option<(String, R::State)>> {
        let Some(record) = self.store.load(address)? else {
            return Ok(None);
        };
        if record.resource_type != resource.resource_type() {
            bail!(
                "{address} is stored as {} but declared as {}",
                record.resource_type,
                resource.resource_type()
            );
        }

        let observed = resource
            .read(&record.id)
            .with_context(|| format!("Failed to read {address} ({})", record.id))?;

        match observed {
            Some(state) => {
                if !self.options.dry_run {
                    let fresh = InstanceRecord::new(resource.resource_type(), &record.id, &state)?;
                    self.store.save(address, fresh)?;
                }
                Ok(Some((record.id, state)))
            }
            None => {
                log::warn!(
                    "{address}: {} no longer exists remotely, clearing identity",
                    record.id
                );
                if !self.options.dry_run {
                    self.store.remove(address)?;
                }
                Ok(None)
            }
        }
    }

    /// Refresh and plan without running any mutating hook
    pub fn plan<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        address: &str,
        desired: Option<&R::Config>,
    ) -> Result<Change> {
        let current = self.refresh(resource, address)?;
        plan_change(
            resource,
            desired,
            current.as_ref().map(|(id, state)| (id.as_str(), state)),
        )
    }

    /// Run one pass, logging progress and confirming every change
    ///
    /// `desired` is `None` to declare the instance deleted.
    pub fn apply<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        address: &str,
        desired: Option<&R::Config>,
    ) -> Result<ApplyResult> {
        self.apply_with(resource, address, desired, &mut LogProgress, &mut AutoConfirm)
    }

    /// Run one pass with explicit callbacks
    ///
    /// Destructive changes (delete, replace) are confirmed first; a declined
    /// change is reported as skipped.
    pub fn apply_with<R, P, C>(
        &mut self,
        resource: &R,
        address: &str,
        desired: Option<&R::Config>,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<ApplyResult>
    where
        R: Resource + ?Sized,
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        let current = self.refresh(resource, address)?;
        let change = plan_change(
            resource,
            desired,
            current.as_ref().map(|(id, state)| (id.as_str(), state)),
        )?;
        progress.on_planned(address, change);

        let result = if !change.is_change() {
            ApplyResult::NoChange
        } else if self.options.dry_run {
            ApplyResult::Skipped {
                reason: format!("dry run: would {change}"),
            }
        } else if change.is_destructive() && !confirm.confirm(&format!("{change} {address}?"))? {
            ApplyResult::Skipped {
                reason: format!("{change} declined"),
            }
        } else {
            self.execute(resource, address, change, desired, current, progress)?
        };

        self.summary.add_result(&result);
        progress.on_complete(address, &result);
        Ok(result)
    }

    /// Adopt an existing remote entity under an address
    pub fn import<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        address: &str,
        id: &str,
    ) -> Result<ApplyResult> {
        if let Some(existing) = self.store.load(address)? {
            bail!("{address} is already bound to {}", existing.id);
        }

        let state = resource
            .import(id)
            .with_context(|| format!("Failed to import {address} ({id})"))?
            .with_context(|| format!("Cannot import {address}: {id} does not exist"))?;

        self.store
            .save(address, InstanceRecord::new(resource.resource_type(), id, &state)?)?;

        let result = ApplyResult::Imported { id: id.to_string() };
        self.summary.add_result(&result);
        Ok(result)
    }

    fn execute<R, P>(
        &mut self,
        resource: &R,
        address: &str,
        change: Change,
        desired: Option<&R::Config>,
        current: Option<(String, R::State)>,
        progress: &mut P,
    ) -> Result<ApplyResult>
    where
        R: Resource + ?Sized,
        P: ProgressCallback,
    {
        match (change, desired, current) {
            (Change::Create, Some(config), _) => {
                let id = self.create(resource, address, config, progress)?;
                Ok(ApplyResult::Created { id })
            }
            (Change::Update, Some(config), Some((id, prior))) => {
                progress.on_hook_start(address, Hook::Update);
                let state = resource
                    .update(&id, config, &prior)
                    .with_context(|| format!("Failed to update {address} ({id})"))?;
                self.store
                    .save(address, InstanceRecord::new(resource.resource_type(), &id, &state)?)?;
                Ok(ApplyResult::Updated { id })
            }
            (Change::Replace, Some(config), Some((previous, prior))) => {
                self.delete(resource, address, &previous, &prior, progress)?;
                let id = self.create(resource, address, config, progress)?;
                Ok(ApplyResult::Replaced { previous, id })
            }
            (Change::Delete, _, Some((id, prior))) => {
                self.delete(resource, address, &id, &prior, progress)?;
                Ok(ApplyResult::Deleted { id })
            }
            (Change::NoOp, ..) => Ok(ApplyResult::NoChange),
            (change, ..) => bail!("{address}: cannot {change} without the required state"),
        }
    }

    fn create<R, P>(
        &mut self,
        resource: &R,
        address: &str,
        config: &R::Config,
        progress: &mut P,
    ) -> Result<String>
    where
        R: Resource + ?Sized,
        P: ProgressCallback,
    {
        progress.on_hook_start(address, Hook::Create);
        let (id, state) = resource
            .create(config)
            .with_context(|| format!("Failed to create {address}"))?;
        self.store
            .save(address, InstanceRecord::new(resource.resource_type(), &id, &state)?)?;
        Ok(id)
    }

    fn delete<R, P>(
        &mut self,
        resource: &R,
        address: &str,
        id: &str,
        prior: &R::State,
        progress: &mut P,
    ) -> Result<()>
    where
        R: Resource + ?Sized,
        P: ProgressCallback,
    {
        progress.on_hook_start(address, Hook::Delete);
        resource
            .delete(id, prior)
            .with_context(|| format!("Failed to delete {address} ({id})"))?;
        self.store.remove(address)
    }
}
