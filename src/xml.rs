//! Minimal XML element tree with deterministic pretty-printing.
//!
//! The two documents this tool emits (the template definition and the plugin
//! result) only need nested elements with text, so a small writer keeps the
//! output byte-stable across runs.

/// One XML element: a name, optional text, child elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    name: String,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append a text-only child element.
    pub fn leaf(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.push(Element::with_text(name, text));
    }

    /// Render with 2-space indentation and a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let empty_text = self.text.as_deref().map_or(true, str::is_empty);
        if self.children.is_empty() && empty_text {
            out.push_str(&format!("{}<{}/>\n", indent, self.name));
            return;
        }
        if self.children.is_empty() {
            out.push_str(&format!(
                "{}<{}>{}</{}>\n",
                indent,
                self.name,
                escape(self.text.as_deref().unwrap_or("")),
                self.name
            ));
            return;
        }
        out.push_str(&format!("{}<{}>\n", indent, self.name));
        for child in &self.children {
            child.write(out, depth + 1);
        }
        out.push_str(&format!("{}</{}>\n", indent, self.name));
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped() {
        let el = Element::with_text("name", "a < b & c");
        assert_eq!(el.to_pretty_string(), "<name>a &lt; b &amp; c</name>\n");
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let el = Element::new("image");
        assert_eq!(el.to_pretty_string(), "<image/>\n");
    }

    #[test]
    fn test_nested_pretty_printing() {
        let mut root = Element::new("resource");
        root.leaf("type", "NODE");
        let mut attr = Element::new("attribute");
        attr.leaf("name", "flow");
        root.push(attr);

        let expected = "<resource>\n  <type>NODE</type>\n  <attribute>\n    <name>flow</name>\n  </attribute>\n</resource>\n";
        assert_eq!(root.to_pretty_string(), expected);
    }
}
