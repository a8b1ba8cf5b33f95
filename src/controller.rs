//! Controller registry.
//!
//! Controllers are registered once at startup under a name, together with
//! their actions. A route that points at `("UserController", "get")` is
//! resolved here at dispatch time: unknown names fail with
//! `HandlerNotFound`, known ones construct a fresh controller from the
//! [`App`] and call the action.
//!
//! ```rust
//! use sprig::{App, Controller, Controllers, Error, Request};
//!
//! struct HomeController;
//!
//! impl Controller for HomeController {
//!     fn construct(_app: &App) -> Result<Self, Error> { Ok(Self) }
//! }
//!
//! impl HomeController {
//!     fn index(&self, _req: &Request) -> Result<&'static str, Error> { Ok("home") }
//! }
//!
//! let mut controllers = Controllers::new();
//! controllers.register::<HomeController>("HomeController")
//!     .action("index", HomeController::index);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::app::App;
use crate::error::{Error, ErrorKind};
use crate::handler::Action;
use crate::reply::{IntoReply, Reply};
use crate::request::Request;

/// A type whose methods serve as route actions.
pub trait Controller: Sized + 'static {
    /// Builds the controller for one request. Pull dependencies out of
    /// `app.container()` here.
    fn construct(app: &App) -> Result<Self, Error>;
}

type Invoke = Box<dyn Fn(&App, &Request) -> Result<Reply, Error> + Send + Sync + 'static>;

/// Name → actions table for every registered controller.
#[derive(Default)]
pub struct Controllers {
    entries: HashMap<String, HashMap<String, Invoke>>,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C` under `name`. Add its actions on the returned value.
    pub fn register<C: Controller>(&mut self, name: impl Into<String>) -> Registration<'_, C> {
        Registration {
            actions: self.entries.entry(name.into()).or_default(),
            _controller: PhantomData,
        }
    }

    pub fn contains(&self, controller: &str, action: &str) -> bool {
        self.entries.get(controller).is_some_and(|a| a.contains_key(action))
    }

    pub(crate) fn invoke(&self, target: &Action, req: &Request, app: &App) -> Result<Reply, Error> {
        let actions = self.entries.get(target.controller()).ok_or_else(|| {
            ErrorKind::HandlerNotFound(format!("Controller {} not found.", target.controller()))
        })?;

        let invoke = actions.get(target.action()).ok_or_else(|| {
            ErrorKind::HandlerNotFound(format!(
                "Method {} not found in controller {}.",
                target.action(),
                target.controller(),
            ))
        })?;

        debug!(controller = target.controller(), action = target.action(), "invoking action");
        invoke(app, req)
    }
}

impl fmt::Debug for Controllers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, actions) in &self.entries {
            map.entry(name, &actions.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

/// Adds actions to a controller being registered.
pub struct Registration<'r, C> {
    actions: &'r mut HashMap<String, Invoke>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> Registration<'_, C> {
    /// Registers `f` as the action `name`. Typically a method path such as
    /// `UserController::get`.
    pub fn action<F, R>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, &Request) -> Result<R, Error> + Send + Sync + 'static,
        R: IntoReply,
    {
        let invoke: Invoke = Box::new(move |app: &App, req: &Request| -> Result<Reply, Error> {
            let controller = C::construct(app)?;
            f(&controller, req).map(IntoReply::into_reply)
        });
        self.actions.insert(name.into(), invoke);
        self
    }
}
