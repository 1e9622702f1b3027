use crate::error::{IfResult, ImmuForgeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact class identifier issued by a [`LabelSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub u16);

impl Label {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed registry of class labels, resolved once before any detector or
/// individual is built.
///
/// Names are stored in lexicographic order and ids follow that order, so
/// iterating labels by id is the deterministic tie-break order used during
/// inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> IfResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .collect();

        if names.iter().any(|n| n.is_empty()) {
            return Err(ImmuForgeError::Validation(
                "Label names must not be blank".to_string(),
            ));
        }

        names.sort();
        names.dedup();

        if names.is_empty() {
            return Err(ImmuForgeError::Validation("Label set is empty".to_string()));
        }
        if names.len() > u16::MAX as usize {
            return Err(ImmuForgeError::Validation(format!(
                "Too many labels: {}",
                names.len()
            )));
        }

        Ok(Self { names })
    }

    /// Parses a comma separated list, e.g. `"spam,ham"`.
    pub fn parse(list: &str) -> IfResult<Self> {
        Self::new(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Option<Label> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name.trim()))
            .ok()
            .map(|i| Label(i as u16))
    }

    pub fn require(&self, name: &str) -> IfResult<Label> {
        self.resolve(name)
            .ok_or_else(|| ImmuForgeError::Validation(format!("Unknown label '{}'", name)))
    }

    pub fn name(&self, label: Label) -> Option<&str> {
        self.names.get(label.index()).map(|s| s.as_str())
    }

    pub fn contains(&self, label: Label) -> bool {
        label.index() < self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        (0..self.names.len()).map(|i| Label(i as u16))
    }

    pub fn first(&self) -> Label {
        Label(0)
    }
}

/// Stored names must already be in canonical order: re-sorting them would
/// silently renumber the labels other data refers to.
impl TryFrom<Vec<String>> for LabelSet {
    type Error = ImmuForgeError;

    fn try_from(names: Vec<String>) -> IfResult<Self> {
        let set = LabelSet::new(&names)?;
        if set.names != names {
            return Err(ImmuForgeError::Validation(format!(
                "Stored labels {:?} are not sorted and unique",
                names
            )));
        }
        Ok(set)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.names
    }
}
