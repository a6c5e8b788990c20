//! The resolve pipeline
//!
//! Every registration owns a pipeline of middleware stages ordered by
//! [`PipelinePhase`]. Each stage receives the request context and a `next`
//! continuation; the last continuation activates the component. The built-in
//! stages handle instance sharing and decorators, and extensions insert their
//! own stages with [`RegistrationBuilder::configure_pipeline`].
//!
//! [`RegistrationBuilder::configure_pipeline`]: crate::registration::RegistrationBuilder::configure_pipeline

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::context::ResolveRequestContext;
use crate::instance::Instance;
use crate::parameters::ConstructorArgs;
use crate::registration::{MiddlewareEntry, PreparingArgs, RegistrationId};
use crate::{DIResult, ServiceLifetime};

/// Pipeline phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelinePhase {
    /// Runs first, before any sharing lookup
    ResolveRequestStart,
    /// Returns shared instances for singleton and scoped registrations
    Sharing,
    /// Runs once per new instance, around decoration and activation
    RegistrationPipelineStart,
    /// Applies decorators to the activated instance
    Decoration,
    /// Creates the instance
    Activation,
}

/// Where in its phase a middleware stage is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareInsertionMode {
    /// Ahead of the stages already in the phase
    StartOfPhase,
    /// Behind the stages already in the phase
    EndOfPhase,
}

/// Continuation passed to a middleware stage
pub type Next<'n> = &'n dyn Fn(&mut ResolveRequestContext<'_>) -> DIResult<()>;

/// A stage of the resolve pipeline
pub trait ResolveMiddleware: Send + Sync {
    fn phase(&self) -> PipelinePhase;

    /// Handle the request; call `next` to run the rest of the pipeline
    fn execute(&self, ctx: &mut ResolveRequestContext<'_>, next: Next<'_>) -> DIResult<()>;
}

pub(crate) type SharedInstances = RwLock<HashMap<RegistrationId, Instance>>;

pub(crate) struct ResolvePipeline {
    stages: Vec<Arc<dyn ResolveMiddleware>>,
}

impl ResolvePipeline {
    pub(crate) fn build(entries: Vec<MiddlewareEntry>) -> Self {
        let mut stages: Vec<Arc<dyn ResolveMiddleware>> =
            vec![Arc::new(SharingMiddleware), Arc::new(DecorationMiddleware)];

        for entry in entries {
            let position = match entry.mode {
                MiddlewareInsertionMode::StartOfPhase => {
                    stages.iter().position(|s| s.phase() >= entry.phase)
                }
                MiddlewareInsertionMode::EndOfPhase => {
                    stages.iter().position(|s| s.phase() > entry.phase)
                }
            }
            .unwrap_or(stages.len());
            debug_assert_eq!(entry.middleware.phase(), entry.phase);
            stages.insert(position, entry.middleware);
        }

        Self { stages }
    }

    pub(crate) fn execute(&self, ctx: &mut ResolveRequestContext<'_>) -> DIResult<()> {
        self.invoke(0, ctx)
    }

    fn invoke(&self, index: usize, ctx: &mut ResolveRequestContext<'_>) -> DIResult<()> {
        match self.stages.get(index) {
            Some(stage) => stage.execute(ctx, &|ctx: &mut ResolveRequestContext<'_>| {
                self.invoke(index + 1, ctx)
            }),
            None => activate(ctx),
        }
    }
}

/// Runs the preparing handlers, then the component's activator
fn activate(ctx: &mut ResolveRequestContext<'_>) -> DIResult<()> {
    let context = ctx.context();
    let registration = ctx.registration().clone();
    let parameters = ctx.take_parameters();

    let mut preparing = PreparingArgs::new(context, &registration, parameters);
    for handler in registration.preparing_handlers() {
        handler(&mut preparing)?;
    }
    let parameters = preparing.into_parameters();

    debug!(
        "Activating {} with {} parameter(s)",
        registration.implementation_type(),
        parameters.len()
    );
    let instance = registration
        .component_type()
        .activate(ConstructorArgs::new(context, parameters))?;
    ctx.set_instance(instance);
    Ok(())
}

struct SharingMiddleware;

impl ResolveMiddleware for SharingMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Sharing
    }

    fn execute(&self, ctx: &mut ResolveRequestContext<'_>, next: Next<'_>) -> DIResult<()> {
        let scope = ctx.context().scope();
        let store = match ctx.registration().lifetime() {
            ServiceLifetime::Transient => return next(ctx),
            ServiceLifetime::Singleton => scope.root_instances(),
            ServiceLifetime::Scoped => scope.scope_instances(),
        };
        let id = ctx.registration().id();

        let existing = store.read().get(&id).cloned();
        if let Some(existing) = existing {
            ctx.set_instance(existing);
            return Ok(());
        }

        next(ctx)?;

        if let Some(created) = ctx.take_instance() {
            // Two threads may race to create the instance; the first stored one wins.
            let shared = store.write().entry(id).or_insert(created).clone();
            ctx.set_instance(shared);
        }
        Ok(())
    }
}

struct DecorationMiddleware;

impl ResolveMiddleware for DecorationMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Decoration
    }

    fn execute(&self, ctx: &mut ResolveRequestContext<'_>, next: Next<'_>) -> DIResult<()> {
        next(ctx)?;

        let registry = ctx.context().scope().registry();
        if !registry.has_decorators() {
            return Ok(());
        }

        if let Some(mut instance) = ctx.take_instance() {
            for interface in instance.interfaces() {
                for decorator in registry.decorators_for(interface.id()) {
                    let current = instance.view_any(interface.id()).cloned();
                    if let Some(decorated) = current.and_then(|view| decorator(&view)) {
                        debug!("Decorated {} of {}", interface, instance.descriptor());
                        instance.replace_view(interface.id(), decorated);
                    }
                }
            }
            ctx.set_instance(instance);
        }
        Ok(())
    }
}
