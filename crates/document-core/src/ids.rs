//! Process-unique identifiers.
//!
//! List positions are not stable across mutation, so paragraphs, insets, lists and documents
//! carry an integer identity assigned at construction. Ids are never reused within a process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Allocate the next unused id.
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a [`crate::Paragraph`], preserved by exact copies.
    ParagraphId,
    NEXT_PARAGRAPH_ID,
    "par#"
);

define_id!(
    /// Identity of a [`crate::Inset`], preserved by exact copies.
    InsetId,
    NEXT_INSET_ID,
    "inset#"
);

define_id!(
    /// Identity of one [`crate::ParagraphList`] instance. Cloning a list allocates a new one.
    ListId,
    NEXT_LIST_ID,
    "list#"
);

define_id!(
    /// Identity of a [`crate::DocumentSession`], used as the text cache key.
    DocumentId,
    NEXT_DOCUMENT_ID,
    "doc#"
);

/// Author of a tracked change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthorId(pub u32);
