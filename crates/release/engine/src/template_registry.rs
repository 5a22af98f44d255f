//! Template registry: stores and retrieves release templates
//!
//! Templates are immutable once registered. To change one, republish it:
//! the replacement gets a new id and links back to the template it
//! supersedes, so releases bound to the old id keep their shape.

use crate::clock::Clock;
use crate::ids::IdSequence;
use parking_lot::RwLock;
use release_types::{FacilityId, ReleaseError, ReleaseResult, ReleaseTemplate, TemplateDraft, TemplateId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    templates: HashMap<TemplateId, ReleaseTemplate>,
    /// Forward links of republish chains
    superseded_by: HashMap<TemplateId, TemplateId>,
}

/// Registry of release templates
pub struct TemplateRegistry {
    inner: RwLock<Inner>,
    ids: IdSequence,
    clock: Arc<dyn Clock>,
}

impl TemplateRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            ids: IdSequence::new(),
            clock,
        }
    }

    /// Register a new template
    ///
    /// Validates the draft before storing and returns the frozen template.
    pub fn register(&self, draft: TemplateDraft) -> ReleaseResult<ReleaseTemplate> {
        let template =
            ReleaseTemplate::publish(self.ids.next().into(), draft, 1, None, self.clock.now())?;
        self.inner
            .write()
            .templates
            .insert(template.id, template.clone());

        tracing::info!(
            template_id = %template.id,
            facility_id = %template.facility_id,
            product_type = %template.product_type,
            "Release template registered"
        );
        Ok(template)
    }

    /// Immutable snapshot of a template
    pub fn resolve(&self, id: TemplateId) -> ReleaseResult<ReleaseTemplate> {
        self.inner
            .read()
            .templates
            .get(&id)
            .cloned()
            .ok_or(ReleaseError::TemplateNotFound(id))
    }

    /// Publish a replacement for `previous`
    ///
    /// Only the newest template of a chain can be republished, and the
    /// replacement must stay with the same facility.
    pub fn republish(
        &self,
        previous: TemplateId,
        draft: TemplateDraft,
    ) -> ReleaseResult<ReleaseTemplate> {
        let mut inner = self.inner.write();
        let prior = inner
            .templates
            .get(&previous)
            .ok_or(ReleaseError::TemplateNotFound(previous))?;

        if let Some(successor) = inner.superseded_by.get(&previous) {
            return Err(ReleaseError::Validation(format!(
                "template {} is already superseded by {}",
                previous, successor
            )));
        }
        if prior.facility_id != draft.facility_id {
            return Err(ReleaseError::Validation(format!(
                "template {} belongs to facility {}, not {}",
                previous, prior.facility_id, draft.facility_id
            )));
        }

        let version = prior.version + 1;
        let template = ReleaseTemplate::publish(
            self.ids.next().into(),
            draft,
            version,
            Some(previous),
            self.clock.now(),
        )?;
        inner.superseded_by.insert(previous, template.id);
        inner.templates.insert(template.id, template.clone());

        tracing::info!(
            template_id = %template.id,
            supersedes = %previous,
            version = version,
            "Release template republished"
        );
        Ok(template)
    }

    /// Current (not superseded) templates of a facility, by id
    pub fn list(&self, facility_id: FacilityId) -> Vec<ReleaseTemplate> {
        let inner = self.inner.read();
        let mut templates: Vec<ReleaseTemplate> = inner
            .templates
            .values()
            .filter(|t| t.facility_id == facility_id && !inner.superseded_by.contains_key(&t.id))
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.id);
        templates
    }

    /// The whole republish chain `id` belongs to, oldest first
    pub fn versions(&self, id: TemplateId) -> ReleaseResult<Vec<ReleaseTemplate>> {
        let inner = self.inner.read();
        let mut root = inner
            .templates
            .get(&id)
            .ok_or(ReleaseError::TemplateNotFound(id))?;
        while let Some(parent) = root.supersedes.and_then(|p| inner.templates.get(&p)) {
            root = parent;
        }

        let mut chain = vec![root.clone()];
        let mut cursor = root.id;
        while let Some(next) = inner
            .superseded_by
            .get(&cursor)
            .and_then(|n| inner.templates.get(n))
        {
            chain.push(next.clone());
            cursor = next.id;
        }
        Ok(chain)
    }

    /// Total number of registered templates, superseded ones included
    pub fn count(&self) -> usize {
        self.inner.read().templates.len()
    }
}
