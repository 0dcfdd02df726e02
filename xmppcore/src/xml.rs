use std::fmt;
use xmppcore_node::node::{Attrs, Node, NodeContent};

/// Renders a node as compact markup for log lines. Attributes are sorted so
/// the output is stable regardless of insertion order.
pub struct DisplayableNode<'a>(pub &'a Node);

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_attributes(attrs: &Attrs) -> String {
    if attrs.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<_> = attrs.iter().collect();
    pairs.sort_unstable_by_key(|(k, _)| *k);

    let mut result = String::new();
    for (key, value) in pairs {
        result.push_str(&format!(" {}=\"{}\"", key, escape(value)));
    }
    result
}

fn format_content(content: &Option<NodeContent>) -> String {
    match content {
        Some(NodeContent::Nodes(nodes)) => nodes
            .iter()
            .map(|n| DisplayableNode(n).to_string())
            .collect(),
        Some(NodeContent::String(s)) => escape(&s.replace('\n', "\\n")),
        None => String::new(),
    }
}

impl<'a> fmt::Display for DisplayableNode<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        let attrs = format_attributes(&node.attrs);
        let content = format_content(&node.content);

        if content.is_empty() {
            write!(f, "<{}{}/>", node.tag, attrs)
        } else {
            write!(f, "<{}{}>{}</{}>", node.tag, attrs, content, node.tag)
        }
    }
}
