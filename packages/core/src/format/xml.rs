//! XML rendering of entity documents.
//!
//! Each entity is written from its kebab-case JSON form: object keys become
//! child elements, arrays repeat a singular element inside their container,
//! and absent (`null`) fields are omitted.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <locations page="0|null|2" next-page="2|null|2" page-size="2">
//!   <location>
//!     <active>true</active>
//!     <aliases>
//!       <alias>Keystone</alias>
//!     </aliases>
//!     <name>KEYS</name>
//!     <office-id>SWT</office-id>
//!   </location>
//! </locations>
//! ```

use serde_json::Value;

use super::{undeclared, ContentType, Formatter, FormattingError, Payload};
use crate::kind::EntityKind;
use crate::paging::PageInfo;

/// Legacy XML. Office documents are always a collection, even for a single
/// office, and pages carry no paging attributes; clients take the cursors
/// from the response headers instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlV1;

/// XML, version 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlV2;

const KINDS: &[EntityKind] = &[EntityKind::Office, EntityKind::Location];
const INDENT: &str = "  ";

impl Formatter for XmlV1 {
    fn name(&self) -> &'static str {
        "XmlV1"
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned("application/xml", "1")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }
        let values = to_values(self, payload)?;
        let mut out = String::from(PROLOG);
        match payload {
            Payload::One(_) if kind != EntityKind::Office => {
                if let Some(value) = values.first() {
                    write_element(&mut out, kind.element(), value, 0);
                }
            }
            _ => write_collection(&mut out, kind, &values, None),
        }
        Ok(out)
    }
}

impl Formatter for XmlV2 {
    fn name(&self) -> &'static str {
        "XmlV2"
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned("application/xml", "2")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }
        let values = to_values(self, payload)?;
        let mut out = String::from(PROLOG);
        match payload {
            Payload::One(_) => {
                if let Some(value) = values.first() {
                    write_element(&mut out, kind.element(), value, 0);
                }
            }
            Payload::Many { .. } => {
                write_collection(&mut out, kind, &values, None);
            }
            Payload::Page { info, .. } => {
                write_collection(&mut out, kind, &values, Some(info));
            }
        }
        Ok(out)
    }
}

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn to_values(formatter: &dyn Formatter, payload: &Payload<'_>) -> Result<Vec<Value>, FormattingError> {
    payload
        .items()
        .iter()
        .map(|item| {
            serde_json::to_value(item).map_err(|e| {
                FormattingError::new(&formatter.content_type(), payload.kind(), e.to_string())
            })
        })
        .collect()
}

fn write_collection(out: &mut String, kind: EntityKind, values: &[Value], info: Option<&PageInfo>) {
    out.push('<');
    out.push_str(kind.plural());
    if let Some(info) = info {
        push_attr(out, "page", &info.page);
        if let Some(next) = &info.next_page {
            push_attr(out, "next-page", next);
        }
        if let Some(total) = info.total {
            push_attr(out, "total", &total.to_string());
        }
        push_attr(out, "page-size", &info.page_size.to_string());
    }
    if values.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for value in values {
        write_element(out, kind.element(), value, 1);
    }
    out.push_str("</");
    out.push_str(kind.plural());
    out.push_str(">\n");
}

fn write_element(out: &mut String, name: &str, value: &Value, depth: usize) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            indent(out, depth);
            open(out, name);
            out.push('\n');
            for (key, child) in map {
                write_element(out, key, child, depth + 1);
            }
            indent(out, depth);
            close(out, name);
        }
        Value::Array(items) => {
            indent(out, depth);
            if items.is_empty() {
                out.push('<');
                out.push_str(name);
                out.push_str("/>\n");
                return;
            }
            open(out, name);
            out.push('\n');
            let item_name = singular(name);
            for item in items {
                write_element(out, &item_name, item, depth + 1);
            }
            indent(out, depth);
            close(out, name);
        }
        Value::String(s) => leaf(out, name, s, depth),
        Value::Bool(b) => leaf(out, name, &b.to_string(), depth),
        Value::Number(n) => leaf(out, name, &n.to_string(), depth),
    }
}

fn leaf(out: &mut String, name: &str, text: &str, depth: usize) {
    indent(out, depth);
    open(out, name);
    escape_into(out, text);
    close(out, name);
}

fn open(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(out, value);
    out.push('"');
}

/// Element name for one item of an array field.
fn singular(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = name.strip_suffix("es").filter(|s| s.ends_with('s') || s.ends_with('x')) {
        stem.to_string()
    } else if let Some(stem) = name.strip_suffix('s') {
        stem.to_string()
    } else {
        format!("{name}-item")
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}
