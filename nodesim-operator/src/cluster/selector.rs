use std::collections::BTreeMap;

/// Label marking node objects as managed by this operator.
pub const MANAGE_LABEL_KEY: &str = "sim.k8s.io/managed";
pub const MANAGE_LABEL_VALUE: &str = "true";
/// Label tying a managed node back to its owning simulator (`<ns>-<name>`).
pub const OWNER_LABEL_KEY: &str = "sim.k8s.io/owned-by";

/// Deterministic name of the simulated node at `index`.
pub fn node_name(ns: &str, name: &str, index: usize) -> String {
    format!("{}-{}-{}", ns, name, index)
}

/// Selector for the managed nodes of one simulator. One value is shared by
/// every list call in a pass and stamps the same labels onto new nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSelector {
    owner: String,
}

impl NodeSelector {
    pub fn owned_by(ns: &str, name: &str) -> Self {
        Self {
            owner: format!("{}-{}", ns, name),
        }
    }

    /// Kubernetes label-selector string; both labels must match.
    pub fn to_label_selector(&self) -> String {
        format!(
            "{}={},{}={}",
            MANAGE_LABEL_KEY, MANAGE_LABEL_VALUE, OWNER_LABEL_KEY, self.owner
        )
    }

    /// Labels a freshly rendered node must carry to match this selector.
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (MANAGE_LABEL_KEY.to_string(), MANAGE_LABEL_VALUE.to_string()),
            (OWNER_LABEL_KEY.to_string(), self.owner.clone()),
        ])
    }

    /// Whether a node's label set satisfies this selector.
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let Some(labels) = labels else {
            return false;
        };
        labels.get(MANAGE_LABEL_KEY).map(String::as_str)
            == Some(MANAGE_LABEL_VALUE)
            && labels.get(OWNER_LABEL_KEY) == Some(&self.owner)
    }
}
