//! Request and result model
//!
//! Requests come in three shapes: void commands, commands with a result and
//! queries. Void commands resolve to [`Unit`] so that every shape flows through
//! the same generic dispatch path.

use std::fmt;

/// The "no value" result of a void command.
///
/// Equal to itself and to nothing else.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit;

impl Unit {
    pub const VALUE: Unit = Unit;
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}

impl From<()> for Unit {
    fn from(_: ()) -> Self {
        Unit
    }
}

/// Discriminates the shape of a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    VoidCommand,
    Command,
    Query,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::VoidCommand | RequestKind::Command => f.write_str("command"),
            RequestKind::Query => f.write_str("query"),
        }
    }
}

/// A value that can be dispatched through the mediator.
///
/// Prefer the [`command!`](crate::command) and [`query!`](crate::query) macros
/// over implementing this by hand.
pub trait Request: Send + Sync + 'static {
    /// What the handler produces. [`Unit`] for void commands.
    type Response: Send + 'static;

    /// Which handler contract serves this request.
    const KIND: RequestKind;

    /// Checked before the request is dispatched. An `Err` aborts the dispatch
    /// with [`MediatorError::InvalidRequest`](super::MediatorError::InvalidRequest).
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A command without a result.
pub trait VoidCommand: Request<Response = Unit> {}

/// A command producing a result.
pub trait Command: Request {}

/// A read-only request producing a result.
pub trait Query: Request {}

/// Type name with module paths stripped, generics included.
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    full.split_inclusive(|c: char| {
        matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';')
    })
    .map(|segment| segment.rsplit("::").next().unwrap_or(segment))
    .collect()
}

/// Describes the handler contract expected for `R`, e.g. `QueryHandler<GetOrder, OrderDto>`.
pub fn handler_contract<R: Request>() -> String {
    let request = short_type_name::<R>();
    match R::KIND {
        RequestKind::VoidCommand => format!("VoidCommandHandler<{request}>"),
        RequestKind::Command => format!(
            "CommandHandler<{request}, {}>",
            short_type_name::<R::Response>()
        ),
        RequestKind::Query => format!(
            "QueryHandler<{request}, {}>",
            short_type_name::<R::Response>()
        ),
    }
}

/// Declares a command.
///
/// ```ignore
/// command!(CreateOrder);                  // void command
/// command!(CreateOrderWithId => Uuid);    // command with a result
/// command!(RenameOrder; validated);       // runs `validator::Validate` first
/// ```
#[macro_export]
macro_rules! command {
    ($ty:ty) => {
        impl $crate::core::Request for $ty {
            type Response = $crate::core::Unit;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::VoidCommand;
        }
        impl $crate::core::VoidCommand for $ty {}
    };
    ($ty:ty; validated) => {
        impl $crate::core::Request for $ty {
            type Response = $crate::core::Unit;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::VoidCommand;

            fn validate(&self) -> ::std::result::Result<(), ::std::string::String> {
                $crate::__private::validator::Validate::validate(self).map_err(|e| e.to_string())
            }
        }
        impl $crate::core::VoidCommand for $ty {}
    };
    ($ty:ty => $resp:ty) => {
        impl $crate::core::Request for $ty {
            type Response = $resp;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::Command;
        }
        impl $crate::core::Command for $ty {}
    };
    ($ty:ty => $resp:ty; validated) => {
        impl $crate::core::Request for $ty {
            type Response = $resp;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::Command;

            fn validate(&self) -> ::std::result::Result<(), ::std::string::String> {
                $crate::__private::validator::Validate::validate(self).map_err(|e| e.to_string())
            }
        }
        impl $crate::core::Command for $ty {}
    };
}

/// Declares a query, e.g. `query!(GetOrder => OrderDto);`.
#[macro_export]
macro_rules! query {
    ($ty:ty => $resp:ty) => {
        impl $crate::core::Request for $ty {
            type Response = $resp;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::Query;
        }
        impl $crate::core::Query for $ty {}
    };
    ($ty:ty => $resp:ty; validated) => {
        impl $crate::core::Request for $ty {
            type Response = $resp;
            const KIND: $crate::core::RequestKind = $crate::core::RequestKind::Query;

            fn validate(&self) -> ::std::result::Result<(), ::std::string::String> {
                $crate::__private::validator::Validate::validate(self).map_err(|e| e.to_string())
            }
        }
        impl $crate::core::Query for $ty {}
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    crate::command!(Ping => String);

    struct Reset;
    crate::command!(Reset);

    struct Lookup;
    crate::query!(Lookup => Vec<u32>);

    #[test]
    fn test_unit_equality() {
        assert_eq!(Unit, Unit::VALUE);
        assert_eq!(Unit::default(), Unit::from(()));
        assert_eq!(Unit.to_string(), "()");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec<String>");
        assert_eq!(short_type_name::<(u32, String)>(), "(u32, String)");
        assert_eq!(short_type_name::<Ping>(), "Ping");
    }

    #[test]
    fn test_handler_contract() {
        assert_eq!(handler_contract::<Reset>(), "VoidCommandHandler<Reset>");
        assert_eq!(handler_contract::<Ping>(), "CommandHandler<Ping, String>");
        assert_eq!(handler_contract::<Lookup>(), "QueryHandler<Lookup, Vec<u32>>");
    }

    #[test]
    fn test_request_kind() {
        assert_eq!(Reset::KIND, RequestKind::VoidCommand);
        assert_eq!(Ping::KIND, RequestKind::Command);
        assert_eq!(Lookup::KIND, RequestKind::Query);
        assert_eq!(RequestKind::VoidCommand.to_string(), "command");
        assert!(Ping.validate().is_ok());
    }
}
