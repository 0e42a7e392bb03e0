//! The JSON object container: an insertion-irrelevant mapping from
//! string keys to `(final, value)` pairs. Iteration order
//! is always sorted by key, so `toJSON` output is stable across clones
//! and across processes.

use std::collections::BTreeMap;

use super::value::Value;
use crate::error::{here, Error, Result};

#[derive(Debug, Clone)]
pub(super) struct Member {
    pub(super) is_final: bool,
    pub(super) value: Value,
}

/// A JSON object. See [`Value::Object`](super::Value::Object).
#[derive(Debug, Clone, Default)]
pub struct Object {
    members: BTreeMap<String, Member>,
    locked: bool,
}

impl Object {
    pub fn new() -> Self {
        Object {
            members: BTreeMap::new(),
            locked: false,
        }
    }

    pub(super) fn is_locked(&self) -> bool {
        self.locked
    }

    pub(super) fn lock(&mut self) {
        self.locked = true;
        for member in self.members.values_mut() {
            member.value.lock();
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.locked {
            return Err(Error::JsonPermViolation {
                reason: "object is locked",
                loc: here!(),
            });
        }
        Ok(())
    }

    /// Inserts a new, non-final member. Fails if `name` already exists.
    pub fn add(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.check_writable()?;
        let name = name.into();
        if self.members.contains_key(&name) {
            return Err(Error::JsonUniqueConstraintViolation {
                name,
                loc: here!(),
            });
        }
        self.members.insert(
            name,
            Member {
                is_final: false,
                value,
            },
        );
        Ok(())
    }

    /// Inserts a new member marked `final`; it can never be overwritten
    /// or removed afterwards. Fails if `name` already exists.
    pub fn add_final(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.check_writable()?;
        let name = name.into();
        if self.members.contains_key(&name) {
            return Err(Error::JsonUniqueConstraintViolation {
                name,
                loc: here!(),
            });
        }
        self.members.insert(
            name,
            Member {
                is_final: true,
                value,
            },
        );
        Ok(())
    }

    /// Inserts or overwrites a non-final member. Fails if the existing
    /// member (if any) is `final`.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.check_writable()?;
        let name = name.into();
        if let Some(existing) = self.members.get(&name) {
            if existing.is_final {
                return Err(Error::JsonPermViolation {
                    reason: "member is final",
                    loc: here!(),
                });
            }
        }
        self.members.insert(
            name,
            Member {
                is_final: false,
                value,
            },
        );
        Ok(())
    }

    /// Like [`set`](Self::set), but marks the member `final` afterwards.
    pub fn set_final(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.check_writable()?;
        let name = name.into();
        if let Some(existing) = self.members.get(&name) {
            if existing.is_final {
                return Err(Error::JsonPermViolation {
                    reason: "member is final",
                    loc: here!(),
                });
            }
        }
        self.members.insert(
            name,
            Member {
                is_final: true,
                value,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.members
            .get(name)
            .map(|m| &m.value)
            .ok_or_else(|| Error::JsonNoSuchName {
                name: name.to_string(),
                loc: here!(),
            })
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Value> {
        self.check_writable()?;
        self.members
            .get_mut(name)
            .map(|m| &mut m.value)
            .ok_or_else(|| Error::JsonNoSuchName {
                name: name.to_string(),
                loc: here!(),
            })
    }

    /// Removes `name`. Fails if the member is `final` or the object is
    /// locked; fails with `NoSuchName` if absent.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.check_writable()?;
        match self.members.get(name) {
            None => Err(Error::JsonNoSuchName {
                name: name.to_string(),
                loc: here!(),
            }),
            Some(m) if m.is_final => Err(Error::JsonPermViolation {
                reason: "member is final",
                loc: here!(),
            }),
            Some(_) => {
                self.members.remove(name);
                Ok(())
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn is_final(&self, name: &str) -> bool {
        self.members.get(name).map(|m| m.is_final).unwrap_or(false)
    }

    /// Member names in sorted (stable) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, m)| (k.as_str(), &m.value))
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Member> {
        self.members.values_mut()
    }
}
