//! Serialisable description of a failure graph.
//!
//! A [`Snapshot`] names every node by an id so that cause links can form
//! cycles. Suppressed links must not: a node's companions are built before
//! the node itself.
//!
//! ```json
//! {
//!   "root": "search",
//!   "nodes": {
//!     "search": { "kind": "server", "message": "search failed", "cause": "remote", "suppressed": ["oom"] },
//!     "remote": { "kind": "remote", "cause": "disk" },
//!     "disk":   { "kind": "io", "message": "disk full", "resource": "logs" },
//!     "oom":    { "kind": "out_of_memory" }
//!   },
//!   "reports": [{ "resource": "logs", "cause": "disk" }]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::dedup::FailureReport;
use crate::error::Error;
use crate::failure::{Failure, FailureKind};

/// One node of a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Kind of the failure.
    pub kind: FailureKind,
    /// Failure message.
    #[serde(default)]
    pub message: Option<String>,
    /// Resource the failure is about.
    #[serde(default)]
    pub resource: Option<String>,
    /// Id of the causing node.
    #[serde(default)]
    pub cause: Option<String>,
    /// Ids of the suppressed companions, in order.
    #[serde(default)]
    pub suppressed: Vec<String>,
}

/// One per-resource report of a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Resource the report is about.
    #[serde(default)]
    pub resource: Option<String>,
    /// Id of the node behind the report.
    pub cause: String,
    /// Report message; defaults to the summary of the cause chain.
    #[serde(default)]
    pub message: Option<String>,
}

/// A failure graph with an optional root and a batch of reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Id of the node to inspect.
    #[serde(default)]
    pub root: Option<String>,
    /// Nodes by id.
    pub nodes: BTreeMap<String, NodeSpec>,
    /// Per-resource reports.
    #[serde(default)]
    pub reports: Vec<ReportSpec>,
}

/// The failures built from a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct Graph {
    /// The root node, if the snapshot names one.
    pub root: Option<Failure>,
    /// The reports, in snapshot order.
    pub reports: Vec<FailureReport<Failure>>,
}

impl Snapshot {
    /// Builds the failure nodes and links them.
    ///
    /// # Errors
    ///
    /// Returns an error when an id is unknown or suppressed links form a cycle.
    pub fn build(&self) -> Result<Graph, Error> {
        let mut built = HashMap::with_capacity(self.nodes.len());
        for id in self.nodes.keys() {
            self.build_node(id, &mut built, &mut Vec::new())?;
        }

        // Causes are linked last so they can point anywhere, cycles included.
        for (id, spec) in &self.nodes {
            if let Some(cause) = &spec.cause {
                let target = lookup(&built, cause)?.clone();
                link_cause(&built[id.as_str()], id, target)?;
            }
        }

        let root = self
            .root
            .as_deref()
            .map(|id| lookup(&built, id).cloned())
            .transpose()?;
        let reports = self
            .reports
            .iter()
            .map(|spec| {
                let cause = lookup(&built, &spec.cause)?.clone();
                let report = FailureReport::new(spec.resource.clone(), cause);
                Ok(match &spec.message {
                    Some(message) => report.with_message(message.clone()),
                    None => report,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Graph { root, reports })
    }

    fn build_node<'a>(
        &'a self,
        id: &'a str,
        built: &mut HashMap<&'a str, Failure>,
        path: &mut Vec<&'a str>,
    ) -> Result<Failure, Error> {
        if let Some(failure) = built.get(id) {
            return Ok(failure.clone());
        }
        if path.contains(&id) {
            return Err(Error::snapshot(format!(
                "suppressed links form a cycle through '{id}'"
            )));
        }
        let spec = self
            .nodes
            .get(id)
            .ok_or_else(|| Error::snapshot(format!("unknown node '{id}'")))?;

        path.push(id);
        let mut suppressed = Vec::with_capacity(spec.suppressed.len());
        for companion in &spec.suppressed {
            suppressed.push(self.build_node(companion, built, path)?);
        }
        path.pop();

        let mut failure = match &spec.message {
            Some(message) => Failure::new(spec.kind, message.clone()),
            None => Failure::bare(spec.kind),
        }
        .with_suppressed(suppressed);
        if let Some(resource) = &spec.resource {
            failure = failure.with_resource(resource.clone());
        }
        built.insert(id, failure.clone());
        Ok(failure)
    }
}

fn link_cause(failure: &Failure, id: &str, cause: Failure) -> Result<(), Error> {
    failure
        .init_cause(cause)
        .map_err(|_| Error::snapshot(format!("cause of node '{id}' already set")))
}

fn lookup<'m>(built: &'m HashMap<&str, Failure>, id: &str) -> Result<&'m Failure, Error> {
    built
        .get(id)
        .ok_or_else(|| Error::snapshot(format!("unknown node '{id}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Chained;
    use crate::walker::format_chain;

    fn parse(json: &str) -> Snapshot {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn builds_linked_graph() {
        let snapshot = parse(
            r#"{
                "root": "search",
                "nodes": {
                    "search": { "kind": "server", "message": "search failed", "cause": "remote", "suppressed": ["oom"] },
                    "remote": { "kind": "remote", "cause": "disk" },
                    "disk": { "kind": "io", "message": "disk full", "resource": "logs" },
                    "oom": { "kind": "out_of_memory" }
                },
                "reports": [{ "resource": "logs", "cause": "disk" }]
            }"#,
        );
        let graph = snapshot.build().unwrap();
        let root = graph.root.unwrap();
        assert_eq!(
            format_chain(Some(&root)),
            "ServerFailure[search failed]; nested: RemoteFailure; nested: IoFailure[disk full]"
        );
        assert_eq!(root.suppressed()[0].kind(), FailureKind::OutOfMemory);
        assert_eq!(graph.reports.len(), 1);
        assert_eq!(graph.reports[0].cause().resource(), Some("logs"));
        assert_eq!(graph.reports[0].message(), "IoFailure[disk full]");
    }

    #[test]
    fn shared_nodes_keep_their_cause() {
        let snapshot = parse(
            r#"{
                "root": "top",
                "nodes": {
                    "top": { "kind": "server", "suppressed": ["shared"], "cause": "shared" },
                    "shared": { "kind": "remote", "cause": "leaf" },
                    "leaf": { "kind": "io", "message": "leaf" }
                }
            }"#,
        );
        let root = snapshot.build().unwrap().root.unwrap();
        let via_suppressed = root.suppressed()[0].cause().unwrap();
        let via_cause = root.cause().unwrap().cause().unwrap();
        assert!(via_suppressed.ptr_eq(via_cause));
    }

    #[test]
    fn cause_cycles_are_allowed() {
        let snapshot = parse(
            r#"{ "root": "a", "nodes": { "a": { "kind": "remote", "cause": "a" } } }"#,
        );
        let root = snapshot.build().unwrap().root.unwrap();
        assert!(root.cause().unwrap().ptr_eq(&root));
    }

    #[test]
    fn suppressed_cycles_are_rejected() {
        let snapshot = parse(
            r#"{ "nodes": {
                "a": { "kind": "server", "suppressed": ["b"] },
                "b": { "kind": "server", "suppressed": ["a"] }
            } }"#,
        );
        let err = snapshot.build().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn relinking_a_cause_is_rejected() {
        let node = Failure::bare(FailureKind::Remote);
        link_cause(&node, "a", Failure::new(FailureKind::Io, "first")).unwrap();
        let err = link_cause(&node, "a", Failure::new(FailureKind::Io, "second")).unwrap_err();
        assert_eq!(err.to_string(), "snapshot: cause of node 'a' already set");
        assert_eq!(node.cause().unwrap().message(), Some("first"));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let snapshot = parse(r#"{ "root": "missing", "nodes": {} }"#);
        assert!(matches!(snapshot.build(), Err(Error::Snapshot(_))));
    }
}
