//! EC2 XML response parsing
//!
//! EC2 query API responses are turned into plain attribute maps. Elements
//! whose name ends in `Set` become arrays of their `item` children; leaf
//! values are typed by field name.

use crate::error::CloudError;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};

/// Leaf fields carrying integers
const INTEGER_FIELDS: &[&str] = &["size", "iops", "throughput", "deviceIndex"];

/// Leaf fields carrying booleans
const BOOLEAN_FIELDS: &[&str] = &[
    "return",
    "encrypted",
    "deleteOnTermination",
    "multiAttachEnabled",
];

/// Parses a raw response body into an attribute map
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<Map<String, Value>, CloudError>;
}

/// Parser bound to one EC2 action, expecting a `<{Action}Response>` document
#[derive(Debug, Clone, Copy)]
pub struct Ec2Parser {
    action: &'static str,
}

impl Ec2Parser {
    pub const fn new(action: &'static str) -> Self {
        Self { action }
    }

}

impl ResponseParser for Ec2Parser {
    fn parse(&self, body: &str) -> Result<Map<String, Value>, CloudError> {
        let root = parse_document(body)?;
        let expected = format!("{}Response", self.action);

        if root.name != expected {
            return Err(CloudError::Parse {
                what: self.action,
                reason: format!("expected <{}>, found <{}>", expected, root.name),
            });
        }

        Ok(object_from_children(&root))
    }
}

/// Element tree built from a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a `/`-separated path of child names
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        path.split('/').try_fold(self, |node, part| node.child(part))
    }
}

/// Parse a document into its root element
pub fn parse_document(xml: &str) -> Result<XmlNode, CloudError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let parse_error = |reason: String| CloudError::Parse {
        what: "XML",
        reason,
    };

    // Synthetic holder for the document root
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(XmlNode::named(e.local_name().as_ref())),
            Ok(Event::Empty(e)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::named(e.local_name().as_ref()));
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| parse_error(e.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| parse_error("unbalanced end tag".to_string()))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| parse_error("unbalanced end tag".to_string()))?;
                parent.children.push(node);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(parse_error(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if stack.len() != 1 {
        return Err(parse_error("unexpected end of document".to_string()));
    }

    stack
        .pop()
        .and_then(|holder| holder.children.into_iter().next())
        .ok_or_else(|| parse_error("empty document".to_string()))
}

/// Extract `Code` and `Message` from an EC2 error document
pub fn parse_error(xml: &str) -> Option<(String, String)> {
    let root = parse_document(xml).ok()?;
    let error = root
        .find("Errors/Error")
        .or_else(|| root.child("Error"))?;

    let code = error.child("Code").map(|c| c.text.clone())?;
    let message = error
        .child("Message")
        .map(|m| m.text.clone())
        .unwrap_or_default();

    Some((code, message))
}

fn object_from_children(node: &XmlNode) -> Map<String, Value> {
    node.children
        .iter()
        .map(|child| (child.name.clone(), node_to_value(child)))
        .collect()
}

fn node_to_value(node: &XmlNode) -> Value {
    if node.name.ends_with("Set") {
        return Value::Array(
            node.children
                .iter()
                .filter(|c| c.name == "item")
                .map(node_to_value)
                .collect(),
        );
    }

    if node.children.is_empty() {
        return leaf_value(&node.name, &node.text);
    }

    Value::Object(object_from_children(node))
}

fn leaf_value(name: &str, text: &str) -> Value {
    if INTEGER_FIELDS.contains(&name) {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(Number::from(n));
        }
    }
    if BOOLEAN_FIELDS.contains(&name) {
        if let Ok(b) = text.parse::<bool>() {
            return Value::Bool(b);
        }
    }
    Value::String(text.to_string())
}
