//! HTTP method bitmask.
//!
//! # Design Decisions
//! - One bit per verb so a single route can answer several verbs
//! - Applicability is a plain intersection test, no ordering between verbs
//! - Unknown verbs map to `Method::NONE` and therefore match nothing

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A set of HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Method(u8);

impl Method {
    pub const NONE: Method = Method(0);
    pub const GET: Method = Method(1 << 0);
    pub const POST: Method = Method(1 << 1);
    pub const PUT: Method = Method(1 << 2);
    pub const DELETE: Method = Method(1 << 3);
    pub const PATCH: Method = Method(1 << 4);
    pub const HEAD: Method = Method(1 << 5);
    /// Union of every defined verb.
    pub const ALL: Method = Method(
        Self::GET.0 | Self::POST.0 | Self::PUT.0 | Self::DELETE.0 | Self::PATCH.0 | Self::HEAD.0,
    );

    const NAMES: [(Method, &'static str); 6] = [
        (Self::GET, "GET"),
        (Self::POST, "POST"),
        (Self::PUT, "PUT"),
        (Self::DELETE, "DELETE"),
        (Self::PATCH, "PATCH"),
        (Self::HEAD, "HEAD"),
    ];

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if the two sets share at least one verb.
    pub const fn intersects(self, other: Method) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every verb of `other` is in `self`.
    pub const fn contains(self, other: Method) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterate the single-verb members, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = Method> {
        Self::NAMES
            .into_iter()
            .map(|(method, _)| method)
            .filter(move |method| self.intersects(*method))
    }

    /// Wire name of a single verb. `None` for empty or combined sets.
    pub fn as_str(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(method, _)| *method == self)
            .map(|(_, name)| *name)
    }

    /// Map a wire verb to its bit. Unrecognised verbs yield `Method::NONE`.
    pub fn from_name(name: &str) -> Method {
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(method, _)| *method)
            .unwrap_or(Method::NONE)
    }
}

impl BitOr for Method {
    type Output = Method;

    fn bitor(self, rhs: Method) -> Method {
        Method(self.0 | rhs.0)
    }
}

impl BitOrAssign for Method {
    fn bitor_assign(&mut self, rhs: Method) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Method {
    type Output = Method;

    fn bitand(self, rhs: Method) -> Method {
        Method(self.0 & rhs.0)
    }
}

impl From<&axum::http::Method> for Method {
    fn from(method: &axum::http::Method) -> Self {
        Method::from_name(method.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for (i, method) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(method.as_str().unwrap_or("?"))?;
        }
        Ok(())
    }
}
