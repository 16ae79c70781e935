//==================================================
// File: guest/interpreter.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: One embedded guest runtime instance
// Objective: Own the heap, the argument stack and the package table, and
//            expose the call primitives the bridge drives
//==================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::errors::{GuestError, GuestResult};
use super::heap::{GuestHeap, GuestSub, SvBody, SvHandle};
use super::stack::GuestStack;

static NEXT_INTERPRETER_ID: AtomicU64 = AtomicU64::new(1);

/// Context a guest call is made in, deciding how many results come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// No results.
    Void,
    /// Exactly one result: the last value returned, or undef.
    Scalar,
    /// Every returned value, in order.
    List,
}

/// What `call_sv` invokes.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// A code value or a reference to one.
    Code(SvHandle),
    /// A sub name, qualified as `Package::name` or resolved in `main`.
    Name(String),
}

#[derive(Debug, Default)]
struct GuestState {
    heap: GuestHeap,
    stack: GuestStack,
}

#[derive(Debug, Default)]
struct GuestPackage {
    subs: HashMap<String, GuestSub>,
    parents: Vec<String>,
}

pub struct GuestInterpreter {
    id: u64,
    state: Mutex<GuestState>,
    packages: RwLock<HashMap<String, GuestPackage>>,
}

impl std::fmt::Debug for GuestInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestInterpreter")
            .field("id", &self.id)
            .field("live", &self.live_count())
            .finish()
    }
}

impl GuestInterpreter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_INTERPRETER_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(GuestState::default()),
            packages: RwLock::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    //==================================================
    // Section 1.0 - Scalars
    //==================================================

    fn allocate(&self, body: SvBody) -> SvHandle {
        self.state.lock().heap.allocate(body)
    }

    /// Runs `f` under the state lock for anything that may free scalars.
    /// Freed bodies are dropped only after the lock is released, since a code
    /// body may hold boundary objects that call back into this interpreter.
    fn locked<R>(&self, f: impl FnOnce(&mut GuestState) -> R) -> R {
        let (result, released) = {
            let mut state = self.state.lock();
            let result = f(&mut *state);
            (result, state.heap.take_released())
        };
        if !released.is_empty() {
            trace!(interpreter = self.id, freed = released.len(), "guest bodies dropped");
        }
        drop(released);
        result
    }

    pub fn new_undef(&self) -> SvHandle {
        self.allocate(SvBody::Undef)
    }

    pub fn new_int(&self, value: i64) -> SvHandle {
        self.allocate(SvBody::Int(value))
    }

    pub fn new_num(&self, value: f64) -> SvHandle {
        self.allocate(SvBody::Num(value))
    }

    pub fn new_str(&self, bytes: impl AsRef<[u8]>) -> SvHandle {
        self.allocate(SvBody::Str(bytes.as_ref().to_vec()))
    }

    /// Takes over one share of every element.
    pub fn new_array(&self, items: Vec<SvHandle>) -> SvHandle {
        self.allocate(SvBody::Array(items))
    }

    pub fn new_hash(&self) -> SvHandle {
        self.allocate(SvBody::Hash(HashMap::new()))
    }

    pub fn new_code(&self, sub: GuestSub) -> SvHandle {
        self.allocate(SvBody::Code(sub))
    }

    /// Reference that takes over the caller's share of `target`.
    pub fn new_rv_noinc(&self, target: SvHandle) -> GuestResult<SvHandle> {
        let mut state = self.state.lock();
        if !state.heap.contains(target) {
            return Err(stale(target));
        }
        Ok(state.heap.allocate(SvBody::Ref(target)))
    }

    /// Reference holding a new share of `target`.
    pub fn new_rv_inc(&self, target: SvHandle) -> GuestResult<SvHandle> {
        let mut state = self.state.lock();
        state.heap.refcnt_inc(target)?;
        Ok(state.heap.allocate(SvBody::Ref(target)))
    }

    /// Appends `item`, taking over the caller's share.
    pub fn av_push(&self, array: SvHandle, item: SvHandle) -> GuestResult<()> {
        let mut state = self.state.lock();
        match state.heap.body_mut(array)? {
            SvBody::Array(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(GuestError::died(format!(
                "not an array: {}",
                other.kind()
            ))),
        }
    }

    /// Stores `value` under `key`, taking over the caller's share and
    /// dropping the share of any value it replaces.
    pub fn hv_store(&self, hash: SvHandle, key: &[u8], value: SvHandle) -> GuestResult<()> {
        self.locked(|state| {
            let replaced = match state.heap.body_mut(hash)? {
                SvBody::Hash(entries) => entries.insert(key.to_vec(), value),
                other => {
                    return Err(GuestError::died(format!("not a hash: {}", other.kind())));
                }
            };
            if let Some(old) = replaced {
                state.heap.refcnt_dec(old)?;
            }
            Ok(())
        })
    }

    pub fn bless(&self, reference: SvHandle, package: &str) -> GuestResult<()> {
        let mut state = self.state.lock();
        let target = match state.heap.body(reference)? {
            SvBody::Ref(target) => *target,
            other => {
                return Err(GuestError::died(format!(
                    "can't bless non-reference value ({})",
                    other.kind()
                )));
            }
        };
        state.heap.bless(target, package)
    }

    /// Snapshot of a scalar's body.
    pub fn body(&self, handle: SvHandle) -> GuestResult<SvBody> {
        self.state.lock().heap.body(handle).cloned()
    }

    pub fn deref(&self, reference: SvHandle) -> GuestResult<SvHandle> {
        match self.state.lock().heap.body(reference)? {
            SvBody::Ref(target) => Ok(*target),
            other => Err(GuestError::died(format!(
                "not a reference: {}",
                other.kind()
            ))),
        }
    }

    pub fn refcnt(&self, handle: SvHandle) -> GuestResult<u32> {
        self.state.lock().heap.refcnt(handle)
    }

    pub fn refcnt_inc(&self, handle: SvHandle) -> GuestResult<u32> {
        self.state.lock().heap.refcnt_inc(handle)
    }

    pub fn refcnt_dec(&self, handle: SvHandle) -> GuestResult<u32> {
        self.locked(|state| state.heap.refcnt_dec(handle))
    }

    pub fn is_live(&self, handle: SvHandle) -> bool {
        self.state.lock().heap.contains(handle)
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().heap.live_count()
    }

    //==================================================
    // Section 2.0 - Stack & Scopes
    //==================================================

    /// Opens a scope that frees its temporaries when the guard drops.
    pub fn enter_scope(self: &Arc<Self>) -> CallScope<'_> {
        let depth = self.state.lock().stack.enter_scope();
        debug!(interpreter = self.id, depth, "guest scope entered");
        CallScope {
            interp: self,
            depth,
        }
    }

    fn leave_scope(&self, depth: usize) {
        let count = self.locked(|state| {
            let temps = state.stack.leave_scope(depth);
            for handle in &temps {
                if let Err(err) = state.heap.refcnt_dec(*handle) {
                    warn!(interpreter = self.id, %err, "temporary already released");
                }
            }
            temps.len()
        });
        debug!(interpreter = self.id, depth, released = count, "guest scope left");
    }

    pub fn push_mark(&self) {
        self.state.lock().stack.push_mark();
    }

    /// Pushes a value whose share stays with the caller.
    pub fn push(&self, handle: SvHandle) -> GuestResult<()> {
        let mut state = self.state.lock();
        if !state.heap.contains(handle) {
            return Err(stale(handle));
        }
        state.stack.push(handle);
        Ok(())
    }

    /// Pushes a value and hands its share to the current scope.
    pub fn push_mortal(&self, handle: SvHandle) -> GuestResult<()> {
        let mut state = self.state.lock();
        if !state.heap.contains(handle) {
            return Err(stale(handle));
        }
        state.stack.mortalize(handle);
        state.stack.push(handle);
        Ok(())
    }

    pub fn mortalize(&self, handle: SvHandle) -> GuestResult<()> {
        let mut state = self.state.lock();
        if !state.heap.contains(handle) {
            return Err(stale(handle));
        }
        state.stack.mortalize(handle);
        Ok(())
    }

    pub fn pop(&self) -> GuestResult<SvHandle> {
        self.state.lock().stack.pop()
    }

    pub fn stack_height(&self) -> usize {
        self.state.lock().stack.height()
    }

    pub fn stack_values(&self) -> Vec<SvHandle> {
        self.state.lock().stack.values().to_vec()
    }

    pub fn scope_depth(&self) -> usize {
        self.state.lock().stack.scope_depth()
    }

    //==================================================
    // Section 3.0 - Packages & Calls
    //==================================================

    pub fn define_sub<F>(&self, package: &str, name: &str, body: F)
    where
        F: Fn(&Arc<GuestInterpreter>, &[SvHandle]) -> GuestResult<Vec<SvHandle>>
            + Send
            + Sync
            + 'static,
    {
        let sub = GuestSub::new(format!("{package}::{name}"), body);
        self.packages
            .write()
            .entry(package.to_string())
            .or_default()
            .subs
            .insert(name.to_string(), sub);
    }

    pub fn set_parents(&self, package: &str, parents: &[&str]) {
        self.packages
            .write()
            .entry(package.to_string())
            .or_default()
            .parents = parents.iter().map(|parent| parent.to_string()).collect();
    }

    /// Depth-first search through the package and its parents.
    pub fn resolve_method(&self, package: &str, method: &str) -> Option<GuestSub> {
        let packages = self.packages.read();
        let mut pending = vec![package.to_string()];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            if let Some(entry) = packages.get(&current) {
                if let Some(sub) = entry.subs.get(method) {
                    return Some(sub.clone());
                }
                pending.extend(entry.parents.iter().rev().cloned());
            }
            seen.push(current);
        }
        None
    }

    pub fn resolve_sub(&self, qualified: &str) -> Option<GuestSub> {
        let (package, name) = qualified.rsplit_once("::").unwrap_or(("main", qualified));
        self.packages
            .read()
            .get(package)
            .and_then(|entry| entry.subs.get(name))
            .cloned()
    }

    /// Calls `method` on the first argument above the innermost mark.
    /// Results are pushed as mortals in logical order; returns their count.
    pub fn call_method(self: &Arc<Self>, method: &str, mode: CallMode) -> GuestResult<usize> {
        let (sub, args) = {
            let mut state = self.state.lock();
            let args = state.stack.take_marked()?;
            let Some(&invocant) = args.first() else {
                return Err(GuestError::InvalidInvocant {
                    method: method.to_string(),
                    reason: "an empty argument list".to_string(),
                });
            };
            let package = invocant_package(&state.heap, invocant, method)?;
            drop(state);
            let sub = self.resolve_method(&package, method).ok_or_else(|| {
                GuestError::MethodNotFound {
                    method: method.to_string(),
                    package,
                }
            })?;
            (sub, args)
        };
        self.run_sub(&sub, &args, mode)
    }

    /// Calls a code value or named sub with everything above the innermost mark.
    pub fn call_sv(self: &Arc<Self>, target: &CallTarget, mode: CallMode) -> GuestResult<usize> {
        let args = self.state.lock().stack.take_marked()?;
        let sub = match target {
            CallTarget::Name(name) => self
                .resolve_sub(name)
                .ok_or_else(|| GuestError::SubNotFound(name.clone()))?,
            CallTarget::Code(handle) => {
                let state = self.state.lock();
                let code = match state.heap.body(*handle)? {
                    SvBody::Ref(target) => state.heap.body(*target)?,
                    body => body,
                };
                match code {
                    SvBody::Code(sub) => sub.clone(),
                    _ => return Err(GuestError::NotCallable),
                }
            }
        };
        self.run_sub(&sub, &args, mode)
    }

    fn run_sub(
        self: &Arc<Self>,
        sub: &GuestSub,
        args: &[SvHandle],
        mode: CallMode,
    ) -> GuestResult<usize> {
        trace!(interpreter = self.id, sub = sub.name(), argc = args.len(), "guest call");
        let mut results = sub.invoke(self, args)?;

        self.locked(|state| {
            let keep = match mode {
                CallMode::Void => 0,
                CallMode::Scalar => 1,
                CallMode::List => results.len(),
            };
            if mode == CallMode::Scalar && results.is_empty() {
                results.push(state.heap.allocate(SvBody::Undef));
            }
            let surplus = results.len() - keep;
            let (dropped, kept) = match mode {
                CallMode::Scalar => results.split_at(surplus),
                _ => {
                    let (kept, dropped) = results.split_at(keep);
                    (dropped, kept)
                }
            };

            // Every live handle is settled before a bad one is reported.
            let mut first_error = None;
            for handle in dropped {
                if let Err(err) = state.heap.refcnt_dec(*handle) {
                    first_error.get_or_insert(err);
                }
            }
            for handle in kept {
                if state.heap.contains(*handle) {
                    state.stack.mortalize(*handle);
                    state.stack.push(*handle);
                } else {
                    first_error.get_or_insert(stale(*handle));
                }
            }
            match first_error {
                Some(err) => Err(err),
                None => Ok(keep),
            }
        })
    }
}

fn stale(handle: SvHandle) -> GuestError {
    GuestError::StaleHandle {
        index: handle.index() as u32,
        generation: handle.generation(),
    }
}

fn invocant_package(heap: &GuestHeap, invocant: SvHandle, method: &str) -> GuestResult<String> {
    let invalid = |reason: &str| GuestError::InvalidInvocant {
        method: method.to_string(),
        reason: reason.to_string(),
    };
    match heap.body(invocant)? {
        SvBody::Str(name) if !name.is_empty() => Ok(String::from_utf8_lossy(name).into_owned()),
        SvBody::Ref(target) => heap
            .blessed(*target)?
            .map(str::to_string)
            .ok_or_else(|| invalid("an unblessed reference")),
        SvBody::Undef => Err(invalid("an undefined value")),
        other => Err(invalid(&format!("a {} without a package", other.kind()))),
    }
}

/// Scoped guest call frame.
///
/// Entering records the stack height and temporaries floor; dropping frees
/// the temporaries created inside and restores the stack, on every exit path.
/// Scopes nest, so a guest call that re-enters the VM and comes back opens
/// its own frame on top of this one.
#[must_use = "the scope is left as soon as the guard is dropped"]
pub struct CallScope<'a> {
    interp: &'a Arc<GuestInterpreter>,
    depth: usize,
}

impl<'a> CallScope<'a> {
    pub fn interpreter(&self) -> &'a Arc<GuestInterpreter> {
        self.interp
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        self.interp.leave_scope(self.depth);
    }
}


//==================================================
// End of file
//==================================================
