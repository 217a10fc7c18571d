use crate::models::lootability::Lootability;
use crate::models::types::{FormId, RefId};
use dashmap::{DashMap, DashSet, Entry};

/// Forms and references the pipeline has decided to stop evaluating, plus the user-managed
/// white and black lists. Each set has its own reset trigger.
#[derive(Debug, Default)]
pub struct LootBlocks {
    blocked_forms: DashMap<FormId, Lootability>,        // until settings push or reload
    permanent_forms: DashMap<FormId, Lootability>,      // process lifetime
    blocked_refs: DashMap<RefId, Lootability>,          // until cell change
    blacklisted_refs: DashSet<RefId>,                   // until reload
    whitelist: DashSet<FormId>,
    blacklist: DashSet<FormId>,
    producers: DashMap<FormId, Option<FormId>>,         // None while the lookup is pending
}

impl LootBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // FORMS
    // ========================================================================

    pub fn block_form(&self, form: FormId, reason: Lootability) {
        tracing::debug!(%form, %reason, "block form");
        self.blocked_forms.insert(form, reason);
    }

    pub fn block_form_permanently(&self, form: FormId, reason: Lootability) {
        tracing::debug!(%form, %reason, "block form permanently");
        self.permanent_forms.insert(form, reason);
    }

    /// Reason the form is blocked, permanent blocks first.
    pub fn form_block(&self, form: FormId) -> Option<Lootability> {
        self.permanent_forms
            .get(&form)
            .or_else(|| self.blocked_forms.get(&form))
            .map(|r| *r)
    }

    pub fn is_form_blocked(&self, form: FormId) -> bool {
        self.permanent_forms.contains_key(&form) || self.blocked_forms.contains_key(&form)
    }

    pub fn reset_blocked_forms(&self) {
        self.blocked_forms.clear();
    }

    // ========================================================================
    // REFERENCES
    // ========================================================================

    pub fn block_reference(&self, refr: RefId, reason: Lootability) {
        tracing::debug!(%refr, %reason, "block reference");
        self.blocked_refs.insert(refr, reason);
    }

    pub fn is_reference_blocked(&self, refr: RefId) -> bool {
        self.blocked_refs.contains_key(&refr)
    }

    pub fn reset_blocked_references(&self) {
        self.blocked_refs.clear();
    }

    pub fn blacklist_reference(&self, refr: RefId) {
        tracing::debug!(%refr, "blacklist reference");
        self.blacklisted_refs.insert(refr);
    }

    pub fn is_reference_blacklisted(&self, refr: RefId) -> bool {
        self.blacklisted_refs.contains(&refr)
    }

    pub fn clear_reference_blacklist(&self) {
        self.blacklisted_refs.clear();
    }

    // ========================================================================
    // MANAGED LISTS
    // ========================================================================

    pub fn set_whitelist(&self, forms: impl IntoIterator<Item = FormId>) {
        self.whitelist.clear();
        for f in forms {
            self.whitelist.insert(f);
        }
    }

    pub fn set_blacklist(&self, forms: impl IntoIterator<Item = FormId>) {
        self.blacklist.clear();
        for f in forms {
            self.blacklist.insert(f);
        }
    }

    pub fn is_whitelisted(&self, form: FormId) -> bool {
        self.whitelist.contains(&form)
    }

    pub fn is_blacklisted(&self, form: FormId) -> bool {
        self.blacklist.contains(&form)
    }

    // ========================================================================
    // PRODUCERS
    // ========================================================================

    /// `Some(None)` while a lookup is pending, `None` when never asked.
    pub fn lootable_for_producer(&self, producer: FormId) -> Option<Option<FormId>> {
        self.producers.get(&producer).map(|v| *v)
    }

    /// Records a resolved lootable. A pending marker (`None`) is only stored when nothing is
    /// recorded yet; returns true when the entry was new.
    pub fn set_lootable_for_producer(&self, producer: FormId, lootable: Option<FormId>) -> bool {
        match lootable {
            Some(_) => self.producers.insert(producer, lootable).is_none(),
            None => match self.producers.entry(producer) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(None);
                    true
                }
            },
        }
    }

    /// Reload: everything except permanent form blocks and the managed lists.
    pub fn reset(&self) {
        self.blocked_forms.clear();
        self.blocked_refs.clear();
        self.blacklisted_refs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_form_blocks_and_reset() {
        let b = LootBlocks::new();
        b.block_form(FormId(1), Lootability::ValueWeightPreventsLooting);
        b.block_form_permanently(FormId(2), Lootability::ObjectIsInBlacklistCollection);
        assert!(b.is_form_blocked(FormId(1)));
        assert_eq!(b.form_block(FormId(2)), Some(Lootability::ObjectIsInBlacklistCollection));
        b.reset();
        assert!(!b.is_form_blocked(FormId(1)));
        assert!(b.is_form_blocked(FormId(2)));
    }

    #[test]
    fn t_reference_sets_are_independent() {
        let b = LootBlocks::new();
        b.block_reference(RefId(5), Lootability::CannotMineTwiceInSameCellVisit);
        b.blacklist_reference(RefId(6));
        b.reset_blocked_references();
        assert!(!b.is_reference_blocked(RefId(5)));
        assert!(b.is_reference_blacklisted(RefId(6)));
    }

    #[test]
    fn t_producer_pending_marker_once() {
        let b = LootBlocks::new();
        assert_eq!(b.lootable_for_producer(FormId(9)), None);
        assert!(b.set_lootable_for_producer(FormId(9), None));
        assert!(!b.set_lootable_for_producer(FormId(9), None));
        assert_eq!(b.lootable_for_producer(FormId(9)), Some(None));
        b.set_lootable_for_producer(FormId(9), Some(FormId(10)));
        assert_eq!(b.lootable_for_producer(FormId(9)), Some(Some(FormId(10))));
    }

    #[test]
    fn t_producer_pending_marker_single_winner() {
        let b = LootBlocks::new();
        let barrier = std::sync::Barrier::new(4);
        let winners = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        b.set_lootable_for_producer(FormId(11), None)
                    })
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).filter(|won| *won).count()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn t_managed_lists_replace() {
        let b = LootBlocks::new();
        b.set_whitelist([FormId(1), FormId(2)]);
        b.set_whitelist([FormId(3)]);
        assert!(!b.is_whitelisted(FormId(1)));
        assert!(b.is_whitelisted(FormId(3)));
        b.set_blacklist([FormId(4)]);
        assert!(b.is_blacklisted(FormId(4)));
    }
}
