use std::fmt::{Display, Formatter};

use thirtyfour::By;

/// How a [`Locator`] identifies its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Id,
    TagName,
}

/// A `(strategy, value)` pair identifying exactly one UI element.
///
/// Locators are plain constants, defined once per UI field. They are turned into a
/// `thirtyfour::By` only when an element is actually looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: Strategy,
    pub value: &'static str,
}

impl Locator {
    pub const fn id(value: &'static str) -> Self {
        Self {
            strategy: Strategy::Id,
            value,
        }
    }

    pub const fn tag_name(value: &'static str) -> Self {
        Self {
            strategy: Strategy::TagName,
            value,
        }
    }

    pub fn by(&self) -> By {
        match self.strategy {
            Strategy::Id => By::Id(self.value),
            Strategy::TagName => By::Tag(self.value),
        }
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let strategy = match self.strategy {
            Strategy::Id => "id",
            Strategy::TagName => "tag",
        };
        write!(f, "{strategy}={}", self.value)
    }
}
