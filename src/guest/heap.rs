//==================================================
// File: guest/heap.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Reference-counted scalar heap of the guest runtime
// Objective: Allocate guest scalars into reusable slots, count shares
//            explicitly and free bodies exactly once
//==================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{GuestError, GuestResult};
use super::interpreter::GuestInterpreter;

/// Handle to a guest scalar.
///
/// The generation changes every time a slot is freed, so a handle that
/// outlived its scalar is rejected instead of aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SvHandle {
    index: u32,
    generation: u32,
}

impl SvHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn stale(&self) -> GuestError {
        GuestError::StaleHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

pub type GuestSubFn =
    dyn Fn(&Arc<GuestInterpreter>, &[SvHandle]) -> GuestResult<Vec<SvHandle>> + Send + Sync;

/// Named guest subroutine. Every handle the body returns is a fresh share
/// handed over to the runtime.
#[derive(Clone)]
pub struct GuestSub {
    name: Arc<str>,
    body: Arc<GuestSubFn>,
}

impl GuestSub {
    pub fn new<F>(name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(&Arc<GuestInterpreter>, &[SvHandle]) -> GuestResult<Vec<SvHandle>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(
        &self,
        interp: &Arc<GuestInterpreter>,
        args: &[SvHandle],
    ) -> GuestResult<Vec<SvHandle>> {
        (self.body)(interp, args)
    }
}

impl fmt::Debug for GuestSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestSub({})", self.name)
    }
}

/// Body of a guest scalar. Container bodies own one share of each child.
#[derive(Debug, Clone)]
pub enum SvBody {
    Undef,
    Int(i64),
    Num(f64),
    Str(Vec<u8>),
    Ref(SvHandle),
    Array(Vec<SvHandle>),
    Hash(HashMap<Vec<u8>, SvHandle>),
    Code(GuestSub),
}

impl SvBody {
    pub fn kind(&self) -> &'static str {
        match self {
            SvBody::Undef => "undef",
            SvBody::Int(_) => "integer",
            SvBody::Num(_) => "number",
            SvBody::Str(_) => "string",
            SvBody::Ref(_) => "reference",
            SvBody::Array(_) => "array",
            SvBody::Hash(_) => "hash",
            SvBody::Code(_) => "code",
        }
    }

    fn children(&self) -> Vec<SvHandle> {
        match self {
            SvBody::Ref(target) => vec![*target],
            SvBody::Array(items) => items.clone(),
            SvBody::Hash(entries) => entries.values().copied().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SvCell {
    refcnt: u32,
    body: SvBody,
    blessed: Option<String>,
}

#[derive(Debug, Default)]
struct SvSlot {
    generation: u32,
    cell: Option<SvCell>,
}

/// Slot heap backing one guest interpreter.
///
/// Freed bodies are parked in `released` rather than dropped in place: a code
/// body can own boundary objects whose release re-enters the interpreter, so
/// the owner drops them once its lock is gone (see [`GuestHeap::take_released`]).
#[derive(Debug, Default)]
pub struct GuestHeap {
    slots: Vec<SvSlot>,
    free: Vec<u32>,
    live: usize,
    released: Vec<SvBody>,
}

impl GuestHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a scalar holding one share owned by the caller.
    pub fn allocate(&mut self, body: SvBody) -> SvHandle {
        let cell = SvCell {
            refcnt: 1,
            body,
            blessed: None,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.cell = Some(cell);
            return SvHandle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(SvSlot {
            generation: 0,
            cell: Some(cell),
        });
        SvHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    fn cell(&self, handle: SvHandle) -> GuestResult<&SvCell> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.cell.as_ref())
            .ok_or_else(|| handle.stale())
    }

    fn cell_mut(&mut self, handle: SvHandle) -> GuestResult<&mut SvCell> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.cell.as_mut())
            .ok_or_else(|| handle.stale())
    }

    pub fn contains(&self, handle: SvHandle) -> bool {
        self.cell(handle).is_ok()
    }

    pub fn body(&self, handle: SvHandle) -> GuestResult<&SvBody> {
        self.cell(handle).map(|cell| &cell.body)
    }

    pub fn body_mut(&mut self, handle: SvHandle) -> GuestResult<&mut SvBody> {
        self.cell_mut(handle).map(|cell| &mut cell.body)
    }

    pub fn refcnt(&self, handle: SvHandle) -> GuestResult<u32> {
        self.cell(handle).map(|cell| cell.refcnt)
    }

    pub fn refcnt_inc(&mut self, handle: SvHandle) -> GuestResult<u32> {
        let cell = self.cell_mut(handle)?;
        cell.refcnt += 1;
        Ok(cell.refcnt)
    }

    /// Drops one share. When the count reaches zero the slot is freed and
    /// every share the body held is dropped in turn.
    pub fn refcnt_dec(&mut self, handle: SvHandle) -> GuestResult<u32> {
        let remaining = {
            let cell = self.cell_mut(handle)?;
            cell.refcnt -= 1;
            cell.refcnt
        };
        if remaining == 0 {
            let mut pending = self.free_slot(handle);
            while let Some(child) = pending.pop() {
                let cell = self.cell_mut(child)?;
                cell.refcnt -= 1;
                if cell.refcnt == 0 {
                    pending.extend(self.free_slot(child));
                }
            }
        }
        Ok(remaining)
    }

    fn free_slot(&mut self, handle: SvHandle) -> Vec<SvHandle> {
        let slot = &mut self.slots[handle.index()];
        let cell = slot.cell.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        let Some(cell) = cell else {
            return Vec::new();
        };
        let children = cell.body.children();
        self.released.push(cell.body);
        children
    }

    /// Hands over the bodies freed since the last call. Dropping them may
    /// run arbitrary drop code.
    pub fn take_released(&mut self) -> Vec<SvBody> {
        std::mem::take(&mut self.released)
    }

    pub fn bless(&mut self, handle: SvHandle, package: &str) -> GuestResult<()> {
        self.cell_mut(handle)?.blessed = Some(package.to_string());
        Ok(())
    }

    pub fn blessed(&self, handle: SvHandle) -> GuestResult<Option<&str>> {
        self.cell(handle).map(|cell| cell.blessed.as_deref())
    }

    /// Number of scalars currently allocated.
    pub fn live_count(&self) -> usize {
        self.live
    }
}


//==================================================
// End of file
//==================================================
