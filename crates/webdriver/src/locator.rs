use std::fmt;

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    ClassName(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn class_name(name: impl Into<String>) -> Self {
        Locator::ClassName(name.into())
    }

    /// The `(using, value)` pair of a find request. W3C drivers only know
    /// css and xpath strategies, so ids and class names become css.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(selector) => ("css selector", selector.clone()),
            Locator::XPath(path) => ("xpath", path.clone()),
            Locator::Id(id) => ("css selector", format!("[id=\"{}\"]", id)),
            Locator::ClassName(name) => ("css selector", format!(".{}", name)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (using, value) = self.strategy();
        write!(f, "{} '{}'", using, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_class_become_css() {
        assert_eq!(
            Locator::id("identifierId").strategy(),
            ("css selector", "[id=\"identifierId\"]".to_string())
        );
        assert_eq!(
            Locator::class_name("XCoPyb").strategy(),
            ("css selector", ".XCoPyb".to_string())
        );
        assert_eq!(Locator::xpath("//div").strategy().0, "xpath");
    }
}
