/// Tags that take part in form validation.
pub const CONTROL_TAGS: [&str; 3] = ["input", "textarea", "select"];

/// Detached element description used to build document nodes.
///
/// An `Element` is a plain value: inserting it into a [`Document`](crate::Document)
/// allocates nodes for it and all of its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    // Identity
    pub tag: String,

    // Markup, in declaration order
    pub attributes: Vec<(String, String)>,

    // Content
    pub text: String,
    pub children: Vec<Element>,

    // Live control state (not reflected as attributes)
    pub value: String,
    pub checked: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn form() -> Self {
        Self::new("form")
    }

    /// Create an `<input>` of the given type.
    pub fn input(kind: impl Into<String>) -> Self {
        Self::new("input").attr("type", kind)
    }

    pub fn textarea() -> Self {
        Self::new("textarea")
    }

    pub fn select() -> Self {
        Self::new("select")
    }

    pub fn button(kind: impl Into<String>) -> Self {
        Self::new("button").attr("type", kind)
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    pub fn ul() -> Self {
        Self::new("ul")
    }

    pub fn li(text: impl Into<String>) -> Self {
        Self::new("li").text(text)
    }

    // Markup
    /// Set an attribute, replacing an existing one with the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Set a boolean attribute (present with an empty value).
    pub fn flag(self, name: impl Into<String>) -> Self {
        self.attr(name, "")
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    // Content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, new_children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(new_children);
        self
    }

    // Live state
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Whether this element is an input, textarea or select.
    pub fn is_control(&self) -> bool {
        CONTROL_TAGS.contains(&self.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_replaces_existing_value() {
        let el = Element::input("text").attr("fx-name", "A").attr("fx-name", "B");
        assert_eq!(el.get_attr("fx-name"), Some("B"));
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn tags_are_lowercased() {
        assert_eq!(Element::new("INPUT").tag, "input");
        assert!(Element::new("Select").is_control());
        assert!(!Element::div().is_control());
    }
}
