//! Depth-first walker shared by every layout pass.
//!
//! A pass implements [`FlowVisitor`] and overrides the hooks for the
//! constructs it cares about. Construct hooks fall back to
//! [`FlowVisitor::begin_node`] / [`FlowVisitor::end_node`], so a pass that
//! treats every node alike only overrides those two.

use crate::ir::{Branch, Construct, FlowNode, NodeId};

#[allow(unused_variables)]
pub trait FlowVisitor {
    /// Checked before every recursive step. Once it returns `true` the walk
    /// unwinds without descending any further.
    fn skip_children(&self) -> bool {
        false
    }

    /// Called for nodes without a kind discriminant; they are never descended.
    fn visit_malformed(&mut self, node: &mut FlowNode) {}

    fn begin_node(&mut self, node: &mut FlowNode) {}
    fn end_node(&mut self, node: &mut FlowNode) {}

    fn begin_branch(&mut self, owner: &NodeId, index: usize, branch: &mut Branch) {}
    fn end_branch(&mut self, owner: &NodeId, index: usize, branch: &mut Branch) {}

    fn begin_conditional(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_conditional(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_loop(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_loop(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_error_handler(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_error_handler(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_fork(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_fork(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_event_start(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_event_start(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_empty(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_empty(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_draft(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_draft(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_comment(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_comment(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_api_call(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_api_call(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_agent_call(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_agent_call(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_prompt(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_prompt(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }

    fn begin_statement(&mut self, node: &mut FlowNode) {
        self.begin_node(node);
    }
    fn end_statement(&mut self, node: &mut FlowNode) {
        self.end_node(node);
    }
}

pub fn traverse_flow<V: FlowVisitor + ?Sized>(nodes: &mut [FlowNode], visitor: &mut V) {
    for node in nodes.iter_mut() {
        if visitor.skip_children() {
            break;
        }
        traverse_node(node, visitor);
    }
}

pub fn traverse_node<V: FlowVisitor + ?Sized>(node: &mut FlowNode, visitor: &mut V) {
    let Some(kind) = node.kind() else {
        tracing::trace!(node = %node.id, "node without kind, skipping");
        visitor.visit_malformed(node);
        return;
    };
    let construct = kind.construct();
    tracing::trace!(node = %node.id, hook = %kind.dispatch_name(), "visit");

    begin(visitor, construct, node);

    if !visitor.skip_children() {
        let owner = node.id.clone();
        for (index, branch) in node.branches.iter_mut().enumerate() {
            if visitor.skip_children() {
                break;
            }
            visitor.begin_branch(&owner, index, branch);
            for child in branch.children.iter_mut() {
                if visitor.skip_children() {
                    break;
                }
                traverse_node(child, visitor);
            }
            visitor.end_branch(&owner, index, branch);
        }
    }

    end(visitor, construct, node);
}

fn begin<V: FlowVisitor + ?Sized>(visitor: &mut V, construct: Construct, node: &mut FlowNode) {
    match construct {
        Construct::Conditional => visitor.begin_conditional(node),
        Construct::Loop => visitor.begin_loop(node),
        Construct::ErrorHandler => visitor.begin_error_handler(node),
        Construct::Fork => visitor.begin_fork(node),
        Construct::EventStart => visitor.begin_event_start(node),
        Construct::Empty => visitor.begin_empty(node),
        Construct::Draft => visitor.begin_draft(node),
        Construct::Comment => visitor.begin_comment(node),
        Construct::ApiCall => visitor.begin_api_call(node),
        Construct::AgentCall => visitor.begin_agent_call(node),
        Construct::Prompt => visitor.begin_prompt(node),
        Construct::Statement => visitor.begin_statement(node),
    }
}

fn end<V: FlowVisitor + ?Sized>(visitor: &mut V, construct: Construct, node: &mut FlowNode) {
    match construct {
        Construct::Conditional => visitor.end_conditional(node),
        Construct::Loop => visitor.end_loop(node),
        Construct::ErrorHandler => visitor.end_error_handler(node),
        Construct::Fork => visitor.end_fork(node),
        Construct::EventStart => visitor.end_event_start(node),
        Construct::Empty => visitor.end_empty(node),
        Construct::Draft => visitor.end_draft(node),
        Construct::Comment => visitor.end_comment(node),
        Construct::ApiCall => visitor.end_api_call(node),
        Construct::AgentCall => visitor.end_agent_call(node),
        Construct::Prompt => visitor.end_prompt(node),
        Construct::Statement => visitor.end_statement(node),
    }
}
