//==================================================
// File: vm/value.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host VM value representation seen by the bridge
// Objective: Model the VM's tagged values, shared aggregates and the
//            capability queries marshaling dispatches on
//==================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::marshal::wrap::GuestScalar;

/// Capabilities a VM value can advertise through `does`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Scalar,
    Array,
    Hash,
}

impl Capability {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(Capability::Scalar),
            "array" => Some(Capability::Array),
            "hash" => Some(Capability::Hash),
            _ => None,
        }
    }
}

/// Tagged VM value. Aggregates and boundary objects are shared handles whose
/// lifetime belongs to the VM heap.
#[derive(Clone)]
pub enum VmValue {
    Undef,
    Integer(i64),
    Float(f64),
    String(String),
    Array(VmArray),
    Hash(VmHash),
    /// Boundary object wrapping a guest scalar.
    Guest(Arc<GuestScalar>),
    Object(VmObject),
}

impl VmValue {
    pub fn string(value: impl Into<String>) -> Self {
        VmValue::String(value.into())
    }

    pub fn type_name(&self) -> &str {
        match self {
            VmValue::Undef => "Undef",
            VmValue::Integer(_) => "Integer",
            VmValue::Float(_) => "Float",
            VmValue::String(_) => "String",
            VmValue::Array(_) => "Array",
            VmValue::Hash(_) => "Hash",
            VmValue::Guest(_) => "GuestScalar",
            VmValue::Object(object) => object.class_name(),
        }
    }

    pub fn isa(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    pub fn does(&self, capability: Capability) -> bool {
        match capability {
            Capability::Scalar => matches!(
                self,
                VmValue::Integer(_) | VmValue::Float(_) | VmValue::String(_) | VmValue::Guest(_)
            ),
            Capability::Array => matches!(self, VmValue::Array(_)),
            Capability::Hash => matches!(self, VmValue::Hash(_)),
        }
    }

    /// Element count for aggregates, zero otherwise.
    pub fn elements(&self) -> usize {
        match self {
            VmValue::Array(array) => array.elements(),
            VmValue::Hash(hash) => hash.elements(),
            _ => 0,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            VmValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            VmValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VmValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_guest(&self) -> Option<&Arc<GuestScalar>> {
        match self {
            VmValue::Guest(scalar) => Some(scalar),
            _ => None,
        }
    }
}

impl fmt::Debug for VmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmValue::Undef => write!(f, "Undef"),
            VmValue::Integer(value) => write!(f, "Integer({value})"),
            VmValue::Float(value) => write!(f, "Float({value})"),
            VmValue::String(value) => write!(f, "String({value:?})"),
            VmValue::Array(array) => write!(f, "Array(len={})", array.elements()),
            VmValue::Hash(hash) => write!(f, "Hash(len={})", hash.elements()),
            VmValue::Guest(scalar) => write!(f, "{scalar:?}"),
            VmValue::Object(object) => write!(f, "Object({})", object.class_name()),
        }
    }
}

/// Scalars compare by value, everything else by identity.
impl PartialEq for VmValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VmValue::Undef, VmValue::Undef) => true,
            (VmValue::Integer(a), VmValue::Integer(b)) => a == b,
            (VmValue::Float(a), VmValue::Float(b)) => a == b,
            (VmValue::String(a), VmValue::String(b)) => a == b,
            (VmValue::Array(a), VmValue::Array(b)) => a.ptr_eq(b),
            (VmValue::Hash(a), VmValue::Hash(b)) => a.ptr_eq(b),
            (VmValue::Guest(a), VmValue::Guest(b)) => Arc::ptr_eq(a, b),
            (VmValue::Object(a), VmValue::Object(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl From<i64> for VmValue {
    fn from(value: i64) -> Self {
        VmValue::Integer(value)
    }
}

impl From<f64> for VmValue {
    fn from(value: f64) -> Self {
        VmValue::Float(value)
    }
}

impl From<&str> for VmValue {
    fn from(value: &str) -> Self {
        VmValue::String(value.to_string())
    }
}

impl From<String> for VmValue {
    fn from(value: String) -> Self {
        VmValue::String(value)
    }
}

impl From<VmArray> for VmValue {
    fn from(value: VmArray) -> Self {
        VmValue::Array(value)
    }
}

impl From<VmHash> for VmValue {
    fn from(value: VmHash) -> Self {
        VmValue::Hash(value)
    }
}

/// Resizable VM array shared between every holder.
#[derive(Clone, Default)]
pub struct VmArray(Arc<RwLock<Vec<VmValue>>>);

impl VmArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<VmValue>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }

    pub fn push(&self, value: impl Into<VmValue>) {
        self.0.write().push(value.into());
    }

    pub fn unshift(&self, value: impl Into<VmValue>) {
        self.0.write().insert(0, value.into());
    }

    pub fn shift(&self) -> Option<VmValue> {
        let mut items = self.0.write();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    pub fn get(&self, index: usize) -> Option<VmValue> {
        self.0.read().get(index).cloned()
    }

    pub fn elements(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Iterates over a snapshot taken when the iterator is created.
    pub fn iter(&self) -> std::vec::IntoIter<VmValue> {
        self.to_vec().into_iter()
    }

    pub fn to_vec(&self) -> Vec<VmValue> {
        self.0.read().clone()
    }

    /// Removes and returns every element, leaving every alias empty.
    pub fn drain(&self) -> Vec<VmValue> {
        std::mem::take(&mut *self.0.write())
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }

    pub fn ptr_eq(&self, other: &VmArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for VmArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VmArray(len={})", self.elements())
    }
}

/// String-keyed VM hash shared between every holder.
#[derive(Clone, Default)]
pub struct VmHash(Arc<RwLock<HashMap<String, VmValue>>>);

impl VmHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<VmValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self(Arc::new(RwLock::new(map)))
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<VmValue>) {
        self.0.write().insert(key.into(), value.into());
    }

    pub fn get_keyed_str(&self, key: &str) -> Option<VmValue> {
        self.0.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    pub fn elements(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<(String, VmValue)> {
        self.0.write().drain().collect()
    }

    pub fn ptr_eq(&self, other: &VmHash) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for VmHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VmHash(len={})", self.elements())
    }
}

/// Opaque VM object the bridge has no marshaling rule for.
#[derive(Clone, Debug)]
pub struct VmObject(Arc<str>);

impl VmObject {
    pub fn new(class_name: impl Into<Arc<str>>) -> Self {
        Self(class_name.into())
    }

    pub fn class_name(&self) -> &str {
        &self.0
    }
}

/// VM-side handle naming a guest package, used as a class invocant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmNamespace {
    ns_name: String,
}

impl VmNamespace {
    pub fn new(ns_name: impl Into<String>) -> Self {
        Self {
            ns_name: ns_name.into(),
        }
    }

    pub fn ns_name(&self) -> &str {
        &self.ns_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_follow_the_tag() {
        let array = VmValue::from(VmArray::from_values(vec![1i64.into()]));
        let hash = VmValue::from(VmHash::from_pairs([("x", 1i64)]));
        assert!(array.does(Capability::Array));
        assert!(!array.does(Capability::Hash));
        assert!(hash.does(Capability::Hash));
        assert!(VmValue::from("s").does(Capability::Scalar));
        assert_eq!(Capability::from_name("array"), Some(Capability::Array));
    }

    #[test]
    fn object_type_name_is_its_class() {
        let object = VmValue::Object(VmObject::new("Sub"));
        assert_eq!(object.type_name(), "Sub");
        assert!(object.isa("Sub"));
        assert!(!object.isa("Integer"));
    }

    #[test]
    fn aggregates_are_shared_between_clones() {
        let array = VmArray::new();
        let alias = array.clone();
        alias.push(1i64);
        array.unshift(0i64);
        assert_eq!(array.to_vec(), vec![VmValue::Integer(0), VmValue::Integer(1)]);
        assert_eq!(alias.shift(), Some(VmValue::Integer(0)));
        assert_eq!(array.elements(), 1);
        assert_eq!(alias.drain(), vec![VmValue::Integer(1)]);
        assert!(array.is_empty());
    }

    #[test]
    fn scalar_accessors_match_the_tag() {
        assert_eq!(VmValue::Integer(4).as_integer(), Some(4));
        assert_eq!(VmValue::Float(0.5).as_float(), Some(0.5));
        assert_eq!(VmValue::string("x").as_str(), Some("x"));
        assert_eq!(VmValue::string("4").as_integer(), None);
        assert_eq!(VmValue::Integer(4).as_str(), None);
    }

    #[test]
    fn hash_drain_empties_every_alias() {
        let hash = VmHash::from_pairs([("a", 1i64), ("b", 2i64)]);
        let alias = hash.clone();
        let mut drained = hash.drain();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(drained[0], ("a".to_string(), VmValue::Integer(1)));
        assert!(alias.is_empty());
    }
}

//==================================================
// End of file
//==================================================
