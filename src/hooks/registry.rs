//! Dispatcher construction and validation.
//!
//! Every authoring mistake the dispatch tables can carry is rejected here,
//! before a session ever fires a hook: duplicate registrations, effect
//! listeners naming effects the engine does not know, and hook orders
//! referencing listeners that were never implemented.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::FatalError;
use crate::session::StatusEffect;

use super::dispatch::HookDispatcher;
use super::listener::{HookListener, ListenerId};
use super::HookId;

/// Builder validating the listener and hook-order tables.
#[derive(Default)]
pub struct HookDispatcherBuilder {
    order: IndexMap<HookId, Vec<ListenerId>>,
    impls: HashMap<ListenerId, Box<dyn HookListener>>,
}

impl HookDispatcherBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener implementation.
    ///
    /// # Errors
    ///
    /// - [`FatalError::DuplicateListener`] if the id is already registered
    /// - [`FatalError::UnknownEffect`] if an effect listener names an
    ///   effect the engine does not know
    pub fn listener(mut self, listener: Box<dyn HookListener>) -> Result<Self, FatalError> {
        let id = listener.id().clone();
        if let ListenerId::Effect(effect) = &id {
            if StatusEffect::from_name(effect.as_str()).is_none() {
                return Err(FatalError::UnknownEffect(effect.clone()));
            }
        }
        if self.impls.insert(id.clone(), listener).is_some() {
            return Err(FatalError::DuplicateListener(id));
        }
        Ok(self)
    }

    /// Registers the listener order for a hook.
    ///
    /// # Errors
    ///
    /// - [`FatalError::DuplicateHook`] if the hook is already registered
    /// - [`FatalError::DuplicateListener`] if a listener appears twice in
    ///   the order
    pub fn hook(mut self, hook: HookId, order: Vec<ListenerId>) -> Result<Self, FatalError> {
        for (i, listener) in order.iter().enumerate() {
            if order[..i].contains(listener) {
                return Err(FatalError::DuplicateListener(listener.clone()));
            }
        }
        if self.order.contains_key(&hook) {
            return Err(FatalError::DuplicateHook(hook));
        }
        self.order.insert(hook, order);
        Ok(self)
    }

    /// Finishes the build, checking the tables against each other.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownListener`] if any ordered listener has no
    /// registered implementation.
    pub fn build(self) -> Result<HookDispatcher, FatalError> {
        for order in self.order.values() {
            for listener in order {
                if !self.impls.contains_key(listener) {
                    return Err(FatalError::UnknownListener(listener.clone()));
                }
            }
        }
        Ok(HookDispatcher::from_parts(self.order, self.impls))
    }
}

impl std::fmt::Debug for HookDispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcherBuilder")
            .field("num_hooks", &self.order.len())
            .field("num_listeners", &self.impls.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{ListenerStep, StateToken};
    use crate::instruction::InputSlot;
    use crate::session::Session;

    struct Noop(ListenerId);

    impl HookListener for Noop {
        fn id(&self) -> &ListenerId {
            &self.0
        }

        fn step(
            &self,
            _session: &mut Session,
            _hook: &HookId,
            _state: Option<&StateToken>,
            _input: &mut InputSlot,
        ) -> Result<ListenerStep, FatalError> {
            Ok(ListenerStep::Complete)
        }
    }

    #[test]
    fn duplicate_listener_rejected() {
        let err = HookDispatcherBuilder::new()
            .listener(Box::new(Noop(ListenerId::role("seer"))))
            .unwrap()
            .listener(Box::new(Noop(ListenerId::role("seer"))))
            .unwrap_err();
        assert!(matches!(err, FatalError::DuplicateListener(_)));
    }

    #[test]
    fn unknown_effect_rejected_at_registration() {
        let err = HookDispatcherBuilder::new()
            .listener(Box::new(Noop(ListenerId::effect("sparkling"))))
            .unwrap_err();
        assert!(matches!(err, FatalError::UnknownEffect(_)));
    }

    #[test]
    fn known_effect_accepted() {
        assert!(
            HookDispatcherBuilder::new()
                .listener(Box::new(Noop(ListenerId::effect("poisoned"))))
                .is_ok()
        );
    }

    #[test]
    fn duplicate_hook_rejected() {
        let err = HookDispatcherBuilder::new()
            .hook(HookId::new("dusk"), vec![])
            .unwrap()
            .hook(HookId::new("dusk"), vec![])
            .unwrap_err();
        assert!(matches!(err, FatalError::DuplicateHook(_)));
    }

    #[test]
    fn duplicate_order_entry_rejected() {
        let err = HookDispatcherBuilder::new()
            .hook(
                HookId::new("dusk"),
                vec![ListenerId::role("seer"), ListenerId::role("seer")],
            )
            .unwrap_err();
        assert!(matches!(err, FatalError::DuplicateListener(_)));
    }

    #[test]
    fn unimplemented_ordered_listener_rejected_at_build() {
        let err = HookDispatcherBuilder::new()
            .hook(HookId::new("dusk"), vec![ListenerId::role("ghost")])
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, FatalError::UnknownListener(_)));
    }
}
