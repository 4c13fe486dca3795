//! Inventory lookup through container views.
//!
//! A container view is a server-side object. [`ContainerView`] owns one for
//! the duration of a scan and destroys it afterwards, including on error
//! paths and panics.

use crate::error::Result;
use crate::vim::{Entity, EntityKind, ManagedObjectReference, VimApi};

/// A server-side recursive view over a folder, destroyed on drop.
pub struct ContainerView<'a, A: VimApi + ?Sized> {
    api: &'a A,
    moref: Option<ManagedObjectReference>,
}

impl<'a, A: VimApi + ?Sized> ContainerView<'a, A> {
    /// Create a recursive view of `kinds` under `root`.
    pub fn open(api: &'a A, root: &ManagedObjectReference, kinds: &[EntityKind]) -> Result<Self> {
        let moref = api.create_container_view(root, kinds, true)?;
        tracing::debug!(view = %moref, ?kinds, "container view created");
        Ok(Self {
            api,
            moref: Some(moref),
        })
    }

    /// Members of the view in server order.
    pub fn entities(&self) -> Result<Vec<Entity>> {
        match self.moref {
            Some(ref moref) => self.api.view_entities(moref),
            None => Ok(Vec::new()),
        }
    }

    /// Destroy the view now and report failures.
    pub fn destroy(mut self) -> Result<()> {
        match self.moref.take() {
            Some(moref) => self.api.destroy_view(&moref),
            None => Ok(()),
        }
    }
}

impl<A: VimApi + ?Sized> Drop for ContainerView<'_, A> {
    fn drop(&mut self) {
        if let Some(moref) = self.moref.take() {
            if let Err(e) = self.api.destroy_view(&moref) {
                tracing::warn!(view = %moref, error = %e, "failed to destroy container view");
            }
        }
    }
}

/// Find an entity under `root`.
///
/// With `name`, returns the first entity whose display name equals it
/// exactly; without, the first entity in view order. `Ok(None)` when nothing
/// matches.
pub fn resolve<A: VimApi + ?Sized>(
    api: &A,
    root: &ManagedObjectReference,
    kinds: &[EntityKind],
    name: Option<&str>,
) -> Result<Option<Entity>> {
    let view = ContainerView::open(api, root, kinds)?;
    let entities = view.entities()?;
    drop(view);

    let found = match name {
        Some(name) => entities.into_iter().find(|e| e.name == name),
        None => entities.into_iter().next(),
    };
    tracing::debug!(?name, found = ?found.as_ref().map(|e| &e.moref), "resolved");
    Ok(found)
}

/// All entities of `kinds` under `root`, in view order.
pub fn list<A: VimApi + ?Sized>(
    api: &A,
    root: &ManagedObjectReference,
    kinds: &[EntityKind],
) -> Result<Vec<Entity>> {
    let view = ContainerView::open(api, root, kinds)?;
    view.entities()
}
