//! Recursive `<s_NAME>` markup parser.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::ParseNode;

/// Field holding the unparsed input when no tag could be decoded.
pub const RAW_OUTPUT_KEY: &str = "raw_output";

/// Deepest tag nesting decoded into objects; deeper bodies are kept as text.
const MAX_DEPTH: usize = 64;

lazy_static! {
    static ref OPEN_TAG: Regex = Regex::new(r"<s_([a-zA-Z0-9_]+)>").unwrap();
}

/// One matched `<s_NAME>body</s_NAME>` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub body: &'a str,
}

/// Iterator over the top-level tag pairs of a text span, left to right.
///
/// Each opener is closed by the nearest following closer with the same
/// name. Openers without a closer are skipped, and text between pairs is
/// ignored.
pub struct TagScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let caps = OPEN_TAG.captures_at(self.text, self.pos)?;
            let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
                return None;
            };

            let closer = format!("</s_{}>", name.as_str());
            match self.text[open.end()..].find(&closer) {
                Some(offset) => {
                    let body_end = open.end() + offset;
                    self.pos = body_end + closer.len();
                    return Some(Tag {
                        name: name.as_str(),
                        body: &self.text[open.end()..body_end],
                    });
                }
                // Unterminated; '<' is one byte so this stays on a char boundary.
                None => self.pos = open.start() + 1,
            }
        }
        None
    }
}

/// Parse tagged text into a tree.
///
/// Never fails: text without any decodable tag yields an object whose only
/// field, [`RAW_OUTPUT_KEY`], holds the untouched input. Tags nested more
/// than 64 levels deep are left undecoded inside their ancestor's body.
pub fn parse(text: &str) -> ParseNode {
    let fields = parse_level(text, 0);
    if fields.is_empty() {
        debug!("No markup tags decoded from {} characters, keeping raw output", text.len());
        let mut raw = IndexMap::new();
        raw.insert(RAW_OUTPUT_KEY.to_string(), ParseNode::Scalar(text.to_string()));
        return ParseNode::Object(raw);
    }
    ParseNode::Object(fields)
}

fn parse_level(text: &str, depth: usize) -> IndexMap<String, ParseNode> {
    let mut contributions: IndexMap<&str, Vec<ParseNode>> = IndexMap::new();

    for tag in TagScanner::new(text) {
        let nested = TagScanner::new(tag.body).next().is_some();
        let node = if nested && depth < MAX_DEPTH {
            ParseNode::Object(parse_level(tag.body, depth + 1))
        } else {
            if nested {
                debug!(
                    "s_{} nested deeper than {} levels, keeping body as text",
                    tag.name, MAX_DEPTH
                );
            }
            let value = tag.body.trim();
            if value.is_empty() {
                continue;
            }
            ParseNode::Scalar(value.to_string())
        };
        contributions.entry(tag.name).or_default().push(node);
    }

    contributions
        .into_iter()
        .map(|(name, mut nodes)| {
            let node = if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                ParseNode::List(nodes)
            };
            (name.to_string(), node)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scalar(text: &str) -> ParseNode {
        ParseNode::Scalar(text.to_string())
    }

    fn object(fields: Vec<(&str, ParseNode)>) -> ParseNode {
        ParseNode::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_single_leaf() {
        assert_eq!(
            parse("<s_total>42.00</s_total>"),
            object(vec![("total", scalar("42.00"))])
        );
    }

    #[test]
    fn test_sibling_repetition_becomes_list() {
        assert_eq!(
            parse("<s_nm>A</s_nm><s_nm>B</s_nm>"),
            object(vec![("nm", ParseNode::List(vec![scalar("A"), scalar("B")]))])
        );
    }

    #[test]
    fn test_tagless_input_falls_back_to_raw_output() {
        for text in ["", "  plain text  ", "<s_open>never closed", "<s_a>x</s_b>"] {
            assert_eq!(parse(text), object(vec![(RAW_OUTPUT_KEY, scalar(text))]));
        }
    }

    #[test]
    fn test_only_empty_leaves_falls_back_to_raw_output() {
        let text = "<s_nm>   </s_nm>";
        assert_eq!(parse(text), object(vec![(RAW_OUTPUT_KEY, scalar(text))]));
    }

    #[test]
    fn test_empty_leaves_are_dropped() {
        assert_eq!(
            parse("<s_nm></s_nm><s_nm>Coffee</s_nm><s_cnt> </s_cnt>"),
            object(vec![("nm", scalar("Coffee"))])
        );
    }

    #[test]
    fn test_nested_and_irregular_shapes() {
        let text = "<s_menu>\
                      <s_nm>Invoice No: 12</s_nm>\
                      <s_nm>Latte</s_nm>\
                      <s_cnt><s_nm>Cafe</s_nm></s_cnt>\
                    </s_menu>\
                    <s_total><s_total_price> 9.50 </s_total_price></s_total>";

        assert_eq!(
            parse(text),
            object(vec![
                (
                    "menu",
                    object(vec![
                        (
                            "nm",
                            ParseNode::List(vec![scalar("Invoice No: 12"), scalar("Latte")])
                        ),
                        ("cnt", object(vec![("nm", scalar("Cafe"))])),
                    ])
                ),
                ("total", object(vec![("total_price", scalar("9.50"))])),
            ])
        );
    }

    #[test]
    fn test_text_beside_inner_tags_is_discarded() {
        assert_eq!(
            parse("<s_menu>loose <s_nm>Tea</s_nm> text</s_menu>"),
            object(vec![("menu", object(vec![("nm", scalar("Tea"))]))])
        );
    }

    #[test]
    fn test_repeated_nested_objects() {
        let text = "<s_menu><s_nm>A</s_nm></s_menu><s_menu><s_nm>B</s_nm></s_menu>";
        assert_eq!(
            parse(text),
            object(vec![(
                "menu",
                ParseNode::List(vec![
                    object(vec![("nm", scalar("A"))]),
                    object(vec![("nm", scalar("B"))]),
                ])
            )])
        );
    }

    #[test]
    fn test_closer_must_repeat_opener_name() {
        assert_eq!(
            parse("<s_a>1</s_b><s_b>2</s_b></s_a>"),
            object(vec![("a", object(vec![("b", scalar("2"))]))])
        );
    }

    #[test]
    fn test_unterminated_opener_is_skipped() {
        assert_eq!(
            parse("<s_x>lost <s_nm>Kept</s_nm>"),
            object(vec![("nm", scalar("Kept"))])
        );
    }

    #[test]
    fn test_multiline_bodies_and_unicode() {
        assert_eq!(
            parse("ü<s_nm>Café\nau lait</s_nm>"),
            object(vec![("nm", scalar("Café\nau lait"))])
        );
    }

    #[test]
    fn test_deep_nesting_is_cut_off() {
        let levels = 20_000;
        let mut text: String = (0..levels).map(|i| format!("<s_t{i}>")).collect();
        text.push('x');
        text.extend((0..levels).rev().map(|i| format!("</s_t{i}>")));

        let mut node = parse(&text);
        let mut objects = 0;
        while let ParseNode::Object(fields) = node {
            assert_eq!(fields.len(), 1);
            objects += 1;
            node = fields.into_values().next().unwrap();
        }

        assert_eq!(objects, MAX_DEPTH + 1);
        let body = node.as_scalar().unwrap();
        assert!(body.starts_with(&format!("<s_t{}>", MAX_DEPTH + 1)));
        assert!(body.ends_with(&format!("</s_t{}>", MAX_DEPTH + 1)));
    }

    #[test]
    fn test_scanner_order() {
        let tags: Vec<_> = TagScanner::new("<s_a>1</s_a>x<s_b><s_c>2</s_c></s_b>").collect();
        assert_eq!(
            tags,
            vec![
                Tag { name: "a", body: "1" },
                Tag { name: "b", body: "<s_c>2</s_c>" },
            ]
        );
    }
}
