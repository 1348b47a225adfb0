//! Identifier newtypes for the workflow domain.
//!
//! Every identifier wraps a UUID so that actor, tenant, template and request
//! identifiers cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a user acting on the workflow engine.
    ActorId
);

uuid_identifier!(
    /// Identifier of a tenant company.
    CompanyId
);

uuid_identifier!(
    /// Identifier of a team inside a company.
    TeamId
);

uuid_identifier!(
    /// Identifier of a TODO whose status the engine governs.
    TodoId
);

uuid_identifier!(
    /// Identifier of a workflow template.
    TemplateId
);

uuid_identifier!(
    /// Identifier of a column inside a workflow template.
    ColumnId
);

uuid_identifier!(
    /// Identifier of an approval request spawned by a gated transition.
    ApprovalRequestId
);

uuid_identifier!(
    /// Identifier of an audit log entry.
    AuditEntryId
);
