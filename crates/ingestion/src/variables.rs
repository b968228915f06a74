//! Requested wind variables and the alias names sources publish them under.
//!
//! Requests name a parameter and optional level, e.g. `UGRD:10 m`. Sources
//! store fields under whatever key their upstream uses; lookup tries the
//! requested name first, then the known aliases for that component.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Keys accepted for the eastward (U) component, in preference order.
pub const U_ALIASES: &[&str] = &["u10", "u", "10u", "UGRD_10maboveground", "UGRD"];

/// Keys accepted for the northward (V) component, in preference order.
pub const V_ALIASES: &[&str] = &["v10", "v", "10v", "VGRD_10maboveground", "VGRD"];

/// Which half of the wind vector a variable carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    U,
    V,
}

impl Component {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Component::U => U_ALIASES,
            Component::V => V_ALIASES,
        }
    }

    /// Classify a variable name, ignoring any `:level` suffix and case.
    pub fn classify(name: &str) -> Option<Component> {
        let base = name.split(':').next().unwrap_or(name).trim();
        [Component::U, Component::V].into_iter().find(|c| {
            c.aliases()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(base))
        })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::U => write!(f, "U"),
            Component::V => write!(f, "V"),
        }
    }
}

/// The pair of variables one fetch asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSet {
    pub u: String,
    pub v: String,
}

impl Default for VariableSet {
    fn default() -> Self {
        Self {
            u: "UGRD:10 m".to_string(),
            v: "VGRD:10 m".to_string(),
        }
    }
}

impl VariableSet {
    /// Build from a list of names, one of which must classify as U and one as V.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let find = |component: Component| {
            names
                .iter()
                .map(AsRef::as_ref)
                .find(|n| Component::classify(n) == Some(component))
                .map(str::to_string)
                .ok_or_else(|| {
                    IngestionError::InvalidConfig(format!(
                        "no {} wind variable among {:?}",
                        component,
                        names.iter().map(AsRef::as_ref).collect::<Vec<_>>()
                    ))
                })
        };
        Ok(Self {
            u: find(Component::U)?,
            v: find(Component::V)?,
        })
    }

    pub fn requested(&self, component: Component) -> &str {
        match component {
            Component::U => &self.u,
            Component::V => &self.v,
        }
    }

    /// Pick the key for `component` out of the keys a source has.
    pub fn resolve<'a, I>(&self, component: Component, available: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let requested = self.requested(component);
        if let Some(hit) = available.clone().into_iter().find(|k| *k == requested) {
            return Some(hit);
        }
        component.aliases().iter().find_map(|alias| {
            available
                .clone()
                .into_iter()
                .find(|k| k.eq_ignore_ascii_case(alias))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Component::classify("UGRD:10 m"), Some(Component::U));
        assert_eq!(Component::classify("10v"), Some(Component::V));
        assert_eq!(Component::classify("vgrd_10maboveground"), Some(Component::V));
        assert_eq!(Component::classify("TMP:2 m"), None);
    }

    #[test]
    fn test_from_names() {
        let set = VariableSet::from_names(&["VGRD:10 m", "UGRD:10 m"]).unwrap();
        assert_eq!(set, VariableSet::default());
        assert!(VariableSet::from_names(&["UGRD:10 m", "TMP:2 m"]).is_err());
    }

    #[test]
    fn test_resolve_prefers_requested_then_aliases() {
        let set = VariableSet::default();
        let keys = ["lat", "UGRD:10 m", "u10", "10v"];
        assert_eq!(set.resolve(Component::U, keys), Some("UGRD:10 m"));
        assert_eq!(set.resolve(Component::V, keys), Some("10v"));

        let keys = ["u", "UGRD"];
        assert_eq!(set.resolve(Component::U, keys), Some("u"));
        assert_eq!(set.resolve(Component::V, keys), None);
    }
}
