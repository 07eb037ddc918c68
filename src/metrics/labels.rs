//! Label types for Prometheus metrics

use prometheus_client::encoding::EncodeLabelSet;

/// Labels for a single completed HTTP request
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub cluster: String,
    pub component: String,
    pub method: String,
    pub path: String,
    pub status: String,
}

/// Labels identifying one of the listeners
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ComponentLabels {
    pub cluster: String,
    pub component: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BuildInfoLabels {
    pub version: String,
    pub commit: String,
    pub branch: String,
    pub arch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_labels_equality() {
        let labels1 = RequestLabels {
            cluster: "default".to_string(),
            component: "web".to_string(),
            method: "GET".to_string(),
            path: "/ping".to_string(),
            status: "200".to_string(),
        };
        let labels2 = labels1.clone();

        assert_eq!(labels1, labels2);
    }

    #[test]
    fn test_request_labels_inequality() {
        let labels1 = RequestLabels {
            cluster: "default".to_string(),
            component: "web".to_string(),
            method: "GET".to_string(),
            path: "/ping".to_string(),
            status: "200".to_string(),
        };
        let labels2 = RequestLabels {
            status: "503".to_string(),
            ..labels1.clone()
        };

        assert_ne!(labels1, labels2);
    }

    #[test]
    fn test_component_labels_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ComponentLabels {
            cluster: "default".to_string(),
            component: "web".to_string(),
        });
        set.insert(ComponentLabels {
            cluster: "default".to_string(),
            component: "web".to_string(),
        });
        set.insert(ComponentLabels {
            cluster: "default".to_string(),
            component: "metrics".to_string(),
        });

        assert_eq!(set.len(), 2);
    }
}
