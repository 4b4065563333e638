//! Heuristic field extraction from the vision model's markup tree.
//!
//! The vision model is a receipt model, so invoice fields are recovered
//! from receipt-shaped paths. Each heuristic is an independent function of
//! the tree; a miss in one never affects another.

use tracing::debug;

use crate::markup::ParseNode;
use crate::models::invoice::{CanonicalInvoiceFields, LineItem};

/// Words marking a `menu.nm` entry as a header or total line, not an item.
const NON_ITEM_WORDS: [&str; 3] = ["invoice", "tax", "total"];

/// Map a markup tree onto the canonical schema.
///
/// Fields without a heuristic (`buyer`, `address`, `currency`, `notes`)
/// stay empty.
pub fn fields_from_tree(tree: &ParseNode) -> CanonicalInvoiceFields {
    CanonicalInvoiceFields {
        invoice_number: extract("invoice_number", invoice_number, tree),
        vendor: extract("vendor", vendor, tree),
        date: extract("date", date, tree),
        subtotal: extract("subtotal", subtotal, tree),
        tax: extract("tax", tax, tree),
        grand_total: extract("grand_total", grand_total, tree),
        items: items(tree),
        ..CanonicalInvoiceFields::default()
    }
}

fn extract(name: &str, heuristic: fn(&ParseNode) -> Option<String>, tree: &ParseNode) -> String {
    heuristic(tree).unwrap_or_else(|| {
        debug!("No value found for {}", name);
        String::new()
    })
}

/// Text after the last `:` of the first `menu.nm` entry mentioning "invoice".
pub fn invoice_number(tree: &ParseNode) -> Option<String> {
    let entry = menu_names(tree).find(|name| name.to_lowercase().contains("invoice"))?;
    let number = entry.rsplit_once(':').map_or(entry, |(_, after)| after).trim();
    non_empty(number)
}

/// `menu.cnt.nm`, first entry when it repeated.
pub fn vendor(tree: &ParseNode) -> Option<String> {
    tree.path(&["menu", "cnt", "nm"])
        .and_then(ParseNode::first_scalar)
        .and_then(non_empty)
}

/// `menu.unitprice`, first entry when it repeated.
///
/// Known mismatch kept as-is: the receipt schema has no date field and the
/// unit price slot is read as the invoice date.
pub fn date(tree: &ParseNode) -> Option<String> {
    tree.path(&["menu", "unitprice"])
        .and_then(ParseNode::first_scalar)
        .and_then(non_empty)
}

/// Every `menu.nm` entry that is not a header or total line.
pub fn items(tree: &ParseNode) -> Vec<LineItem> {
    menu_names(tree)
        .filter(|name| {
            let lower = name.to_lowercase();
            NON_ITEM_WORDS.iter().all(|word| !lower.contains(word))
        })
        .map(|name| LineItem::described(name.trim()))
        .collect()
}

/// `sub_total.amount`, only when `sub_total` is an object.
pub fn subtotal(tree: &ParseNode) -> Option<String> {
    match tree.get("sub_total")? {
        section @ ParseNode::Object(_) => section
            .get("amount")
            .and_then(ParseNode::first_scalar)
            .and_then(non_empty),
        ParseNode::Scalar(_) | ParseNode::List(_) => None,
    }
}

/// Top-level `tax`, else `sub_total.tax`.
pub fn tax(tree: &ParseNode) -> Option<String> {
    tree.get("tax")
        .and_then(ParseNode::first_scalar)
        .and_then(non_empty)
        .or_else(|| {
            tree.path(&["sub_total", "tax"])
                .and_then(ParseNode::first_scalar)
                .and_then(non_empty)
        })
}

/// `total.total_price`, else top-level `total_price`.
pub fn grand_total(tree: &ParseNode) -> Option<String> {
    tree.path(&["total", "total_price"])
        .and_then(ParseNode::first_scalar)
        .and_then(non_empty)
        .or_else(|| {
            tree.get("total_price")
                .and_then(ParseNode::first_scalar)
                .and_then(non_empty)
        })
}

/// Scalar entries of `menu.nm`, whether it is a list or a single value.
fn menu_names(tree: &ParseNode) -> impl Iterator<Item = &str> {
    tree.path(&["menu", "nm"])
        .map(ParseNode::entries)
        .unwrap_or_default()
        .iter()
        .filter_map(ParseNode::as_scalar)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
