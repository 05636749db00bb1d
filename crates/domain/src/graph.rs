//! Organization tree snapshot with parent/children adjacency.
//!
//! The builder always produces a forest: duplicate records, parents that are
//! missing from the snapshot and parent cycles are repaired deterministically
//! and reported as [`GraphAnomaly`] values instead of failing the build.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::{Display, Formatter};

use orgaccess_core::OrganizationId;

use crate::Organization;

/// Data-integrity problem repaired while building a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphAnomaly {
    /// Several records shared one id; the last record in input order was kept.
    DuplicateOrganization {
        /// Repeated identifier.
        organization_id: OrganizationId,
    },
    /// The parent is not part of the snapshot; the node is treated as a root.
    MissingParent {
        /// Node whose parent is unknown.
        organization_id: OrganizationId,
        /// Referenced parent.
        parent_organization_id: OrganizationId,
    },
    /// The node closed a parent cycle; its parent link was cut.
    CycleBroken {
        /// Node turned into a synthetic root.
        organization_id: OrganizationId,
        /// Parent link that was dropped.
        dropped_parent_id: OrganizationId,
    },
}

impl Display for GraphAnomaly {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateOrganization { organization_id } => write!(
                formatter,
                "organization '{organization_id}' appears more than once; last record kept"
            ),
            Self::MissingParent {
                organization_id,
                parent_organization_id,
            } => write!(
                formatter,
                "organization '{organization_id}' references unknown parent '{parent_organization_id}'"
            ),
            Self::CycleBroken {
                organization_id,
                dropped_parent_id,
            } => write!(
                formatter,
                "organization '{organization_id}' closes a parent cycle; link to '{dropped_parent_id}' dropped"
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct GraphNode {
    organization: Organization,
    parent: Option<OrganizationId>,
    children: Vec<OrganizationId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Immutable, acyclic view of an organization snapshot.
#[derive(Debug, Clone, Default)]
pub struct OrganizationGraph {
    nodes: HashMap<OrganizationId, GraphNode>,
    roots: Vec<OrganizationId>,
    anomalies: Vec<GraphAnomaly>,
}

impl OrganizationGraph {
    /// Builds the graph from a flat list of organization records.
    #[must_use]
    pub fn build(records: impl IntoIterator<Item = Organization>) -> Self {
        let mut anomalies = Vec::new();

        let mut records: Vec<Organization> = records.into_iter().collect();
        records.sort_by(|left, right| left.id().cmp(right.id()));

        let mut organizations: BTreeMap<OrganizationId, Organization> = BTreeMap::new();
        for record in records {
            let organization_id = record.id().clone();
            if organizations.insert(organization_id.clone(), record).is_some() {
                anomalies.push(GraphAnomaly::DuplicateOrganization { organization_id });
            }
        }

        let mut parents: BTreeMap<OrganizationId, Option<OrganizationId>> = BTreeMap::new();
        for (organization_id, organization) in &organizations {
            let parent = match organization.parent_organization_id() {
                Some(parent_id) if organizations.contains_key(parent_id) => {
                    Some(parent_id.clone())
                }
                Some(parent_id) => {
                    anomalies.push(GraphAnomaly::MissingParent {
                        organization_id: organization_id.clone(),
                        parent_organization_id: parent_id.clone(),
                    });
                    None
                }
                None => None,
            };
            parents.insert(organization_id.clone(), parent);
        }

        break_cycles(&mut parents, &mut anomalies);

        let mut roots = Vec::new();
        let mut children: HashMap<OrganizationId, Vec<OrganizationId>> = HashMap::new();
        for (organization_id, parent) in &parents {
            match parent {
                Some(parent_id) => children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(organization_id.clone()),
                None => roots.push(organization_id.clone()),
            }
        }

        let mut nodes: HashMap<OrganizationId, GraphNode> =
            HashMap::with_capacity(organizations.len());
        for (organization_id, organization) in organizations {
            let parent = parents.get(&organization_id).cloned().flatten();
            let node_children = children.remove(&organization_id).unwrap_or_default();
            nodes.insert(
                organization_id,
                GraphNode {
                    organization,
                    parent,
                    children: node_children,
                },
            );
        }

        Self {
            nodes,
            roots,
            anomalies,
        }
    }

    /// Returns whether the organization is part of the snapshot.
    #[must_use]
    pub fn contains(&self, organization_id: &OrganizationId) -> bool {
        self.nodes.contains_key(organization_id)
    }

    /// Returns the organization record.
    #[must_use]
    pub fn get(&self, organization_id: &OrganizationId) -> Option<&Organization> {
        self.nodes
            .get(organization_id)
            .map(|node| &node.organization)
    }

    /// Returns the number of organizations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the snapshot holds no organizations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates every known organization id in unspecified order.
    pub fn organization_ids(&self) -> impl Iterator<Item = &OrganizationId> {
        self.nodes.keys()
    }

    /// Returns root organizations, including synthetic roots, ordered by id.
    #[must_use]
    pub fn roots(&self) -> &[OrganizationId] {
        &self.roots
    }

    /// Returns the effective parent after integrity repair.
    #[must_use]
    pub fn parent(&self, organization_id: &OrganizationId) -> Option<&OrganizationId> {
        self.nodes
            .get(organization_id)
            .and_then(|node| node.parent.as_ref())
    }

    /// Returns direct children ordered by id, or `None` for unknown ids.
    #[must_use]
    pub fn children(&self, organization_id: &OrganizationId) -> Option<&[OrganizationId]> {
        self.nodes
            .get(organization_id)
            .map(|node| node.children.as_slice())
    }

    /// Returns the ancestor chain, nearest-first and starting with the node itself.
    ///
    /// Returns `None` when the organization is not part of the snapshot.
    #[must_use]
    pub fn ancestor_chain(&self, organization_id: &OrganizationId) -> Option<Ancestors<'_>> {
        let (key, _) = self.nodes.get_key_value(organization_id)?;
        Some(Ancestors {
            graph: self,
            next: Some(key),
        })
    }

    /// Returns the number of strict ancestors of the organization.
    #[must_use]
    pub fn depth(&self, organization_id: &OrganizationId) -> Option<usize> {
        self.ancestor_chain(organization_id)
            .map(|chain| chain.count().saturating_sub(1))
    }

    /// Returns the organization and all of its descendants in breadth-first order.
    #[must_use]
    pub fn descendants(&self, organization_id: &OrganizationId) -> Option<Vec<&OrganizationId>> {
        let (start, _) = self.nodes.get_key_value(organization_id)?;
        let mut visited = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            visited.push(current);
            if let Some(node) = self.nodes.get(current) {
                queue.extend(node.children.iter());
            }
        }

        Some(visited)
    }

    /// Returns integrity problems repaired during the build.
    #[must_use]
    pub fn anomalies(&self) -> &[GraphAnomaly] {
        &self.anomalies
    }
}

/// Nearest-first iterator over an ancestor chain.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    graph: &'a OrganizationGraph,
    next: Option<&'a OrganizationId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a OrganizationId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

/// Walks parent pointers from every node and cuts the link that closes a loop.
///
/// Walks start in id order so the repaired forest does not depend on input order.
fn break_cycles(
    parents: &mut BTreeMap<OrganizationId, Option<OrganizationId>>,
    anomalies: &mut Vec<GraphAnomaly>,
) {
    let mut states: HashMap<OrganizationId, VisitState> = HashMap::with_capacity(parents.len());
    let starts: Vec<OrganizationId> = parents.keys().cloned().collect();

    for start in starts {
        if states.contains_key(&start) {
            continue;
        }

        let mut path = Vec::new();
        let mut current = start;
        loop {
            states.insert(current.clone(), VisitState::InProgress);
            path.push(current.clone());

            let Some(parent_id) = parents.get(&current).cloned().flatten() else {
                break;
            };

            match states.get(&parent_id) {
                Some(VisitState::Done) => break,
                Some(VisitState::InProgress) => {
                    if let Some(dropped_parent_id) =
                        parents.get_mut(&parent_id).and_then(Option::take)
                    {
                        anomalies.push(GraphAnomaly::CycleBroken {
                            organization_id: parent_id,
                            dropped_parent_id,
                        });
                    }
                    break;
                }
                None => current = parent_id,
            }
        }

        for visited in path {
            states.insert(visited, VisitState::Done);
        }
    }
}
