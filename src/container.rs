//! Dependency container.
//!
//! A key → factory registry. Factories run lazily, on every
//! [`Container::using`] call, so a binding can hand out a fresh handle (a
//! database connection, say) or a clone of something shared. Every factory
//! receives the container itself and may resolve other bindings.
//!
//! Repositories and services are bound per interface, a trait object type:
//!
//! ```
//! use std::sync::Arc;
//! use sprig::Container;
//!
//! trait UserRepository: Send + Sync {
//!     fn name(&self, id: u32) -> Option<String>;
//! }
//!
//! struct InMemory(String);
//!
//! impl UserRepository for InMemory {
//!     fn name(&self, _: u32) -> Option<String> { Some(self.0.clone()) }
//! }
//!
//! let mut c = Container::new();
//! c.bind("admin", |_| "ada".to_owned());
//! c.bind_repository::<dyn UserRepository, _>(|c| {
//!     Ok(Arc::new(InMemory(c.using("admin")?)))
//! });
//!
//! let users = c.repository::<dyn UserRepository>().unwrap();
//! assert_eq!(users.name(1).as_deref(), Some("ada"));
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind};

type Factory = Box<dyn Fn(&Container) -> Box<dyn Any + Send> + Send + Sync + 'static>;

const REPOSITORY: &str = "Repository";
const SERVICE: &str = "Service";

#[derive(Default)]
pub struct Container {
    bindings: HashMap<String, Factory>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `factory`, replacing any previous binding.
    pub fn bind<T, F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.bindings.insert(
            key.into(),
            Box::new(move |c: &Container| Box::new(factory(c)) as Box<dyn Any + Send>),
        );
        self
    }

    /// Binds the repository implementing interface `I`.
    pub fn bind_repository<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<I>, Error> + Send + Sync + 'static,
    {
        self.bind(interface_key::<I>(REPOSITORY), factory)
    }

    /// Binds the service implementing interface `I`.
    pub fn bind_service<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<I>, Error> + Send + Sync + 'static,
    {
        self.bind(interface_key::<I>(SERVICE), factory)
    }

    /// Resolves the repository bound for `I`. The interface name must contain
    /// `Repository`.
    pub fn repository<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, Error> {
        self.interface::<I>(REPOSITORY)
    }

    /// Resolves the service bound for `I`. The interface name must contain
    /// `Service`.
    pub fn service<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, Error> {
        self.interface::<I>(SERVICE)
    }

    fn interface<I: ?Sized + Send + Sync + 'static>(&self, kind: &'static str) -> Result<Arc<I>, Error> {
        let interface = short_name::<I>();
        if !interface.contains(kind) {
            return Err(Error::new(ErrorKind::InvalidInterface { kind, interface }));
        }

        let key = interface_key::<I>(kind);
        if !self.has(&key) {
            return Err(Error::new(ErrorKind::InterfaceNotFound { kind, interface }));
        }
        self.using::<Result<Arc<I>, Error>>(&key)?
    }

    pub fn has(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Runs the factory bound to `key`.
    ///
    /// Fails with `ContainerKeyNotFound` when nothing is bound and with
    /// `ContainerType` when the factory produces something other than `T`.
    pub fn using<T: Any>(&self, key: &str) -> Result<T, Error> {
        let factory = self.bindings.get(key)
            .ok_or_else(|| ErrorKind::ContainerKeyNotFound(key.to_owned()))?;

        factory(self)
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| Error::new(ErrorKind::ContainerType(format!("{key} ({})", type_name::<T>()))))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("keys", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn interface_key<I: ?Sized>(kind: &str) -> String {
    format!("{}:{}", kind.to_lowercase(), type_name::<I>())
}

/// `dyn app::repo::UserRepository` → `UserRepository`
fn short_name<I: ?Sized>() -> String {
    let name = type_name::<I>();
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name).to_owned()
}
