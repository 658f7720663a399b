#![forbid(unsafe_code)]

//! Error types shared by the binding runtime.
//!
//! Creation-time failures ([`BindError`]) are returned synchronously to the
//! caller. Delivery-time failures ([`SchedulerUnavailable`], [`HandlerFault`])
//! never cross the scheduling boundary: the runtime logs them and moves on.

use std::fmt;
use std::sync::Arc;

use crate::identity::PropertyIdentity;

/// Why a selector expression could not be resolved to a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorIssue {
    /// Nothing to resolve.
    Empty,
    /// The expression calls a method or function.
    MethodCall,
    /// The expression indexes into a collection.
    Indexing,
    /// The expression reaches through more than one member.
    NestedAccess,
    /// The closure body reads from something other than its parameter.
    ForeignReceiver,
    /// Arithmetic, literals, or any other computed expression.
    Computation,
}

impl SelectorIssue {
    fn describe(self) -> &'static str {
        match self {
            Self::Empty => "empty selector",
            Self::MethodCall => "method call",
            Self::Indexing => "indexing",
            Self::NestedAccess => "nested member access",
            Self::ForeignReceiver => "access through a value other than the closure parameter",
            Self::Computation => "computed expression",
        }
    }
}

/// Failure to resolve a selector or to create a subject for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The selector is not a single direct member access.
    UnsupportedSelector {
        owner: &'static str,
        expr: &'static str,
        issue: SelectorIssue,
    },
    /// The selector names a member the owner never declared.
    UnknownMember {
        owner: &'static str,
        member: String,
    },
    /// The member's declared kind or value type differs from the request.
    TypeMismatch {
        identity: PropertyIdentity,
        /// What the owner declared, e.g. `property of alloc::string::String`.
        expected: String,
        /// What the caller asked for.
        found: String,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSelector { owner, expr, issue } => write!(
                f,
                "unsupported selector `{expr}` on {owner}: {}",
                issue.describe()
            ),
            Self::UnknownMember { owner, member } => {
                write!(f, "{owner} declares no bindable member `{member}`")
            }
            Self::TypeMismatch {
                identity,
                expected,
                found,
            } => write!(
                f,
                "type mismatch for {identity}: declared as {expected}, requested as {found}"
            ),
        }
    }
}

impl std::error::Error for BindError {}

/// The target execution context no longer accepts work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerUnavailable {
    context: Arc<str>,
}

impl SchedulerUnavailable {
    #[must_use]
    pub fn new(context: impl Into<Arc<str>>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// Name of the context that rejected the task.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl fmt::Display for SchedulerUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution context `{}` is no longer available", self.context)
    }
}

impl std::error::Error for SchedulerUnavailable {}

/// A message handler panicked or returned an error during delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    /// Type name of the message being delivered.
    pub message_type: &'static str,
    /// Registration id of the failing handler.
    pub subscriber: u64,
    /// Panic payload or error text.
    pub detail: String,
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler #{} for {} failed: {}",
            self.subscriber, self.message_type, self.detail
        )
    }
}

impl std::error::Error for HandlerFault {}

/// Render a panic payload caught by `catch_unwind` as text.
#[must_use]
pub fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_selector_names_expression_and_issue() {
        let err = BindError::UnsupportedSelector {
            owner: "Editor",
            expr: "items[0]",
            issue: SelectorIssue::Indexing,
        };
        let msg = err.to_string();
        assert!(msg.contains("items[0]"));
        assert!(msg.contains("indexing"));
    }

    #[test]
    fn scheduler_unavailable_reports_context() {
        let err = SchedulerUnavailable::new("gui");
        assert_eq!(err.context(), "gui");
        assert!(err.to_string().contains("`gui`"));
    }

    #[test]
    fn panic_detail_handles_both_string_kinds() {
        let a: Box<dyn std::any::Any + Send> = Box::new("boom");
        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let c: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_detail(a.as_ref()), "boom");
        assert_eq!(panic_detail(b.as_ref()), "bang");
        assert_eq!(panic_detail(c.as_ref()), "non-string panic payload");
    }
}
