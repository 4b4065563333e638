//! Decoding of the vision model's `<s_NAME>...</s_NAME>` markup.
//!
//! The markup is decoded into a [`ParseNode`] tree. Repeated sibling tags
//! collapse into a [`ParseNode::List`], so the same tag name may be a scalar
//! under one parent and a list under another. Consumers must handle all
//! three variants at every lookup.

mod parser;

pub use parser::{parse, Tag, TagScanner, RAW_OUTPUT_KEY};

use indexmap::IndexMap;
use serde::Serialize;

/// Generic tree decoded from tagged text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParseNode {
    /// Trimmed, non-empty leaf text.
    Scalar(String),
    /// Contributions of a tag that repeated under one parent, in order.
    List(Vec<ParseNode>),
    /// Child tags of one parent, in first-seen order.
    Object(IndexMap<String, ParseNode>),
}

impl ParseNode {
    /// Look up a child of an object node.
    pub fn get(&self, key: &str) -> Option<&ParseNode> {
        match self {
            ParseNode::Object(fields) => fields.get(key),
            ParseNode::Scalar(_) | ParseNode::List(_) => None,
        }
    }

    /// Follow a chain of object keys.
    pub fn path(&self, keys: &[&str]) -> Option<&ParseNode> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Leaf text, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParseNode::Scalar(text) => Some(text.as_str()),
            ParseNode::List(_) | ParseNode::Object(_) => None,
        }
    }

    /// Entries of a list, or the node itself as a one-element slice.
    pub fn entries(&self) -> &[ParseNode] {
        match self {
            ParseNode::List(items) => items.as_slice(),
            ParseNode::Scalar(_) | ParseNode::Object(_) => std::slice::from_ref(self),
        }
    }

    /// Leaf text of the node, or of the first entry when it is a list.
    pub fn first_scalar(&self) -> Option<&str> {
        match self {
            ParseNode::Scalar(text) => Some(text.as_str()),
            ParseNode::List(items) => items.first().and_then(ParseNode::as_scalar),
            ParseNode::Object(_) => None,
        }
    }

    /// Re-encode the tree as markup.
    ///
    /// Lists expand back into repeated sibling tags, so re-parsing the
    /// output reproduces any parsed tree that has no empty objects.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            ParseNode::Scalar(text) => out.push_str(text),
            ParseNode::List(items) => items.iter().for_each(|item| item.write_markup(out)),
            ParseNode::Object(fields) => {
                for (name, child) in fields {
                    for entry in child.entries() {
                        out.push_str(&format!("<s_{name}>"));
                        entry.write_markup(out);
                        out.push_str(&format!("</s_{name}>"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scalar(text: &str) -> ParseNode {
        ParseNode::Scalar(text.to_string())
    }

    #[test]
    fn test_path_lookup() {
        let tree = parse("<s_menu><s_cnt><s_nm>ACME</s_nm></s_cnt></s_menu>");

        assert_eq!(tree.path(&["menu", "cnt", "nm"]), Some(&scalar("ACME")));
        assert_eq!(tree.path(&["menu", "missing"]), None);
        assert_eq!(tree.path(&["menu", "cnt", "nm", "deeper"]), None);
    }

    #[test]
    fn test_entries_and_first_scalar() {
        let list = ParseNode::List(vec![scalar("A"), scalar("B")]);
        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.first_scalar(), Some("A"));

        let single = scalar("C");
        assert_eq!(single.entries(), &[scalar("C")]);
        assert_eq!(single.first_scalar(), Some("C"));

        let object = parse("<s_a>1</s_a>");
        assert_eq!(object.first_scalar(), None);
        assert_eq!(object.as_scalar(), None);
    }

    #[test]
    fn test_serializes_like_json() {
        let tree = parse("<s_nm>A</s_nm><s_nm>B</s_nm><s_total><s_total_price>9</s_total_price></s_total>");
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"{"nm":["A","B"],"total":{"total_price":"9"}}"#);
    }

    #[test]
    fn test_markup_round_trip() {
        let text = "<s_menu><s_nm>Invoice No: 7</s_nm><s_nm>Widget</s_nm>\
                    <s_cnt><s_nm>ACME</s_nm></s_cnt></s_menu>\
                    <s_sub_total><s_amount>10</s_amount></s_sub_total>";
        let tree = parse(text);

        assert_eq!(parse(&tree.to_markup()), tree);
    }
}
