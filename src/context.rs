//! Flow context: a user job with its node, workflow and execution.

use std::collections::{BTreeMap, HashSet};

use crate::error::{ManualTaskError, Result};
use crate::resource::{get_as, GetParams, ResourceClient, USERS_JOBS};
use crate::types::{Execution, FlowNode, JobId, NodeId, UserJob, Workflow};

/// Associations loaded together with a user job.
pub const FLOW_CONTEXT_APPENDS: [&str; 6] = [
    "node",
    "job",
    "workflow",
    "workflow.nodes",
    "execution",
    "execution.jobs",
];

/// Everything a task view needs, fetched once.
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// The job, with its associations moved into the fields below.
    pub user_job: UserJob,
    /// The manual node that spawned the job.
    pub node: FlowNode,
    /// The workflow, without its node list.
    pub workflow: Option<Workflow>,
    /// The workflow's nodes, linked.
    pub graph: NodeGraph,
    /// The owning execution.
    pub execution: Execution,
}

impl FlowContext {
    /// Fetches job `job_id` with [`FLOW_CONTEXT_APPENDS`].
    pub async fn load(client: &dyn ResourceClient, job_id: JobId) -> Result<Self> {
        let params = GetParams::by_id(job_id).with_appends(FLOW_CONTEXT_APPENDS);
        let job: UserJob = get_as(client, USERS_JOBS, &params).await?;
        tracing::debug!(job_id, status = %job.status, "loaded flow context");
        Self::from_job(job)
    }

    /// Splits a job fetched with its associations.
    ///
    /// The node and the execution are required.
    pub fn from_job(mut job: UserJob) -> Result<Self> {
        let malformed = |reason: &str| ManualTaskError::MalformedRecord {
            job_id: job.id,
            reason: reason.to_string(),
        };
        let node = job.node.take().ok_or_else(|| malformed("node not loaded"))?;
        let execution = job
            .execution
            .take()
            .ok_or_else(|| malformed("execution not loaded"))?;
        let mut workflow = job.workflow.take();
        let nodes = workflow
            .as_mut()
            .map(|w| std::mem::take(&mut w.nodes))
            .unwrap_or_default();

        Ok(Self {
            user_job: job,
            node,
            workflow,
            graph: NodeGraph::link(nodes),
            execution,
        })
    }

    /// Upstream nodes of the job's node, nearest first.
    pub fn upstreams(&self) -> Vec<&FlowNode> {
        self.graph.available_upstreams(self.node.id)
    }
}

/// Workflow nodes indexed by id, with their links resolved.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: BTreeMap<NodeId, FlowNode>,
    branches: BTreeMap<NodeId, Vec<NodeId>>,
}

impl NodeGraph {
    /// Indexes `nodes` and collects branch heads under their parent.
    ///
    /// Links to nodes outside the list are ignored.
    pub fn link(nodes: Vec<FlowNode>) -> Self {
        let nodes: BTreeMap<NodeId, FlowNode> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let mut branches: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for node in nodes.values() {
            if let (Some(_), Some(parent)) = (node.branch_index, node.upstream_id) {
                if nodes.contains_key(&parent) {
                    branches.entry(parent).or_default().push(node.id);
                }
            }
        }
        for heads in branches.values_mut() {
            heads.sort_by_key(|id| nodes.get(id).and_then(|n| n.branch_index));
        }
        Self { nodes, branches }
    }

    /// Looks a node up.
    pub fn get(&self, id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(&id)
    }

    /// Previous node of `id`.
    pub fn upstream(&self, id: NodeId) -> Option<&FlowNode> {
        self.get(id)?.upstream_id.and_then(|up| self.get(up))
    }

    /// Next node of `id`.
    pub fn downstream(&self, id: NodeId) -> Option<&FlowNode> {
        self.get(id)?.downstream_id.and_then(|down| self.get(down))
    }

    /// Heads of the branches under `id`, by branch index.
    pub fn branches(&self, id: NodeId) -> Vec<&FlowNode> {
        self.branches
            .get(&id)
            .map(|heads| heads.iter().filter_map(|h| self.get(*h)).collect())
            .unwrap_or_default()
    }

    /// Walks the upstream chain of `id`, nearest first.
    ///
    /// A branch head's upstream is the node that owns the branch, so the
    /// walk leaves branches toward the trunk. The walk stops at the first
    /// node seen twice.
    pub fn available_upstreams(&self, id: NodeId) -> Vec<&FlowNode> {
        let mut seen = HashSet::from([id]);
        let mut result = Vec::new();
        let mut current = self.upstream(id);
        while let Some(node) = current {
            if !seen.insert(node.id) {
                tracing::warn!(node_id = id, cycle_at = node.id, "upstream chain contains a cycle");
                break;
            }
            result.push(node);
            current = self.upstream(node.id);
        }
        result
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
