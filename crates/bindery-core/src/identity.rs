#![forbid(unsafe_code)]

//! Member identities and selector resolution.
//!
//! An owner type declares its bindable members once, in a registration table
//! (see [`bindable!`](crate::bindable)). A [`Selector`] names one of those
//! members by expression and resolves to a [`PropertyIdentity`]: the pair
//! `(owner type, member name)` used as a cache key by providers.
//!
//! # Accepted selector shapes
//!
//! | Expression       | Meaning                                   |
//! |------------------|-------------------------------------------|
//! | `message`        | member `message` of the owner             |
//! | `\|v\| v.message` | closure performing one direct member read |
//!
//! Everything else (method calls, indexing, chained access, arithmetic) is
//! rejected with [`BindError::UnsupportedSelector`]; a computed expression has
//! no stable identity to assign.
//!
//! # Invariants
//!
//! 1. Resolving any selector for the same member of the same owner type yields
//!    identities that compare equal, regardless of spelling or call site.
//! 2. A [`selector!`](crate::selector) call site parses at most once per owner
//!    type; later resolutions are a cache read.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::error::{BindError, SelectorIssue};

/// Whether a member is a plain property or a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Command,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property => f.write_str("property"),
            Self::Command => f.write_str("command"),
        }
    }
}

/// One row of an owner's registration table.
///
/// For properties the value type is the stored value; for commands it is the
/// execution argument.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    name: &'static str,
    kind: MemberKind,
    value_type: TypeId,
    value_type_name: &'static str,
}

impl Member {
    /// Declare a property member holding a `T`.
    #[must_use]
    pub fn property<T: 'static>(name: &'static str) -> Self {
        Self::declare::<T>(name, MemberKind::Property)
    }

    /// Declare a command member executed with a `T` argument.
    #[must_use]
    pub fn command<T: 'static>(name: &'static str) -> Self {
        Self::declare::<T>(name, MemberKind::Command)
    }

    fn declare<T: 'static>(name: &'static str, kind: MemberKind) -> Self {
        Self {
            name,
            kind,
            value_type: TypeId::of::<T>(),
            value_type_name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    #[must_use]
    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    /// Whether this member is a `kind` member declared with value type `T`.
    #[must_use]
    pub fn accepts<T: 'static>(&self, kind: MemberKind) -> bool {
        self.kind == kind && self.value_type == TypeId::of::<T>()
    }
}

/// A type whose members can be bound through a provider.
///
/// Implement with [`bindable!`](crate::bindable) rather than by hand.
pub trait Bindable: 'static {
    /// The owner's registration table.
    fn members() -> &'static [Member];
}

/// Stable key identifying one member of one owner type.
///
/// Equality and hashing consider only the owner's `TypeId` and the member
/// name; the owner's type name is carried for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct PropertyIdentity {
    owner: TypeId,
    owner_name: &'static str,
    member: &'static str,
}

impl PropertyIdentity {
    fn of<O: Bindable>(member: &'static str) -> Self {
        Self {
            owner: TypeId::of::<O>(),
            owner_name: type_name::<O>(),
            member,
        }
    }

    #[must_use]
    pub fn owner_type(&self) -> TypeId {
        self.owner
    }

    #[must_use]
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    #[must_use]
    pub fn member(&self) -> &'static str {
        self.member
    }
}

impl PartialEq for PropertyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.member == other.member
    }
}

impl Eq for PropertyIdentity {}

impl Hash for PropertyIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.member.hash(state);
    }
}

impl fmt::Display for PropertyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner_name, self.member)
    }
}

/// A successfully resolved selector.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    identity: PropertyIdentity,
    member: &'static Member,
}

impl Resolved {
    #[must_use]
    pub fn identity(&self) -> PropertyIdentity {
        self.identity
    }

    #[must_use]
    pub fn member(&self) -> &'static Member {
        self.member
    }
}

/// Per-call-site resolution cache used by [`selector!`](crate::selector).
///
/// Remembers the owner type it resolved for, so a call site instantiated for
/// several owners (inside generic code) falls back to resolving afresh.
pub struct SelectorCache {
    slot: OnceLock<(TypeId, Result<Resolved, BindError>)>,
}

impl SelectorCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    fn get_or_resolve<O: Bindable>(&self, expr: &'static str) -> Result<Resolved, BindError> {
        let (owner, result) = self
            .slot
            .get_or_init(|| (TypeId::of::<O>(), resolve_member::<O>(expr)));
        if *owner == TypeId::of::<O>() {
            result.clone()
        } else {
            resolve_member::<O>(expr)
        }
    }
}

impl Default for SelectorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed reference to one member of `O`, written as an expression.
pub struct Selector<O> {
    expr: &'static str,
    cache: Option<&'static SelectorCache>,
    _owner: PhantomData<fn() -> O>,
}

impl<O> Clone for Selector<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Selector<O> {}

impl<O> fmt::Debug for Selector<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("owner", &type_name::<O>())
            .field("expr", &self.expr)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl<O: Bindable> Selector<O> {
    /// An uncached selector; every [`resolve`](Self::resolve) parses `expr`.
    #[must_use]
    pub fn new(expr: &'static str) -> Self {
        Self {
            expr,
            cache: None,
            _owner: PhantomData,
        }
    }

    /// A selector backed by a call-site cache.
    #[must_use]
    pub fn cached(expr: &'static str, cache: &'static SelectorCache) -> Self {
        Self {
            expr,
            cache: Some(cache),
            _owner: PhantomData,
        }
    }

    #[must_use]
    pub fn expr(&self) -> &'static str {
        self.expr
    }

    /// Resolve to the declared member.
    ///
    /// # Errors
    ///
    /// - [`BindError::UnsupportedSelector`] if `expr` is not a single direct
    ///   member access.
    /// - [`BindError::UnknownMember`] if `O` does not declare the member.
    pub fn resolve(&self) -> Result<Resolved, BindError> {
        match self.cache {
            Some(cache) => cache.get_or_resolve::<O>(self.expr),
            None => resolve_member::<O>(self.expr),
        }
    }
}

/// Resolve a selector to its identity.
///
/// # Errors
///
/// See [`Selector::resolve`].
pub fn resolve<O: Bindable>(selector: &Selector<O>) -> Result<PropertyIdentity, BindError> {
    selector.resolve().map(|resolved| resolved.identity)
}

fn resolve_member<O: Bindable>(expr: &'static str) -> Result<Resolved, BindError> {
    let owner = type_name::<O>();
    let name = parse_member(expr).map_err(|issue| BindError::UnsupportedSelector {
        owner,
        expr,
        issue,
    })?;
    let member = O::members()
        .iter()
        .find(|member| member.name == name)
        .ok_or_else(|| BindError::UnknownMember {
            owner,
            member: name.to_string(),
        })?;
    tracing::trace!(owner, member = member.name, "resolved selector");
    Ok(Resolved {
        identity: PropertyIdentity::of::<O>(member.name),
        member,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Literal,
    Punct(char),
}

fn tokenize(expr: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            let mut end = start + ch.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    end = idx + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if ch.is_ascii_digit() {
                tokens.push(Token::Literal);
            } else {
                tokens.push(Token::Ident(&expr[start..end]));
            }
        } else {
            tokens.push(Token::Punct(ch));
        }
    }
    tokens
}

/// Extract the member name from a selector expression.
fn parse_member(expr: &str) -> Result<&str, SelectorIssue> {
    let tokens = tokenize(expr);
    let (receiver, body) = match tokens.as_slice() {
        [Token::Punct('|'), Token::Ident(param), Token::Punct('|'), body @ ..] => {
            (Some(*param), body)
        }
        all => (None, all),
    };
    match (receiver, body) {
        (_, []) => Err(SelectorIssue::Empty),
        (None, [Token::Ident(name)]) => Ok(*name),
        (Some(param), [Token::Ident(recv), Token::Punct('.'), Token::Ident(name)]) => {
            if *recv == param {
                Ok(*name)
            } else {
                Err(SelectorIssue::ForeignReceiver)
            }
        }
        (_, body) => Err(diagnose(body)),
    }
}

fn diagnose(body: &[Token<'_>]) -> SelectorIssue {
    if body.contains(&Token::Punct('(')) {
        SelectorIssue::MethodCall
    } else if body.contains(&Token::Punct('[')) {
        SelectorIssue::Indexing
    } else if body
        .iter()
        .all(|token| matches!(token, Token::Ident(_) | Token::Punct('.')))
    {
        SelectorIssue::NestedAccess
    } else {
        SelectorIssue::Computation
    }
}

/// Declare the bindable members of an owner type.
///
/// ```ignore
/// bindable!(EditorViewModel {
///     property title: String,
///     command save: (),
/// });
/// ```
#[macro_export]
macro_rules! bindable {
    ($owner:ty { $($kind:ident $name:ident : $value:ty),* $(,)? }) => {
        impl $crate::identity::Bindable for $owner {
            fn members() -> &'static [$crate::identity::Member] {
                static MEMBERS: ::std::sync::OnceLock<::std::vec::Vec<$crate::identity::Member>> =
                    ::std::sync::OnceLock::new();
                MEMBERS.get_or_init(|| {
                    ::std::vec![
                        $($crate::identity::Member::$kind::<$value>(::core::stringify!($name))),*
                    ]
                })
            }
        }
    };
}

/// Build a cached [`Selector`] for a member of `$owner`.
///
/// ```ignore
/// let title = provider.create_property::<String>(selector!(EditorViewModel, title))?;
/// let save = provider.create_command::<()>(selector!(EditorViewModel, |v| v.save), true)?;
/// ```
#[macro_export]
macro_rules! selector {
    ($owner:ty, $($expr:tt)+) => {{
        static RESOLVED: $crate::identity::SelectorCache = $crate::identity::SelectorCache::new();
        $crate::identity::Selector::<$owner>::cached(::core::stringify!($($expr)+), &RESOLVED)
    }};
}
