//! # Pulse
//!
//! A reactive UI framework for Rust. This facade crate re-exports the
//! framework's building blocks:
//!
//! - [`reactive`]: fine-grained signals, effects and batched updates;
//! - [`pages`]: renderable view nodes and mount containers;
//! - [`router`]: the client-side navigation engine (feature `router`,
//!   on by default).
//!
//! ## Quick start
//!
//! ```ignore
//! use pulse::prelude::*;
//!
//! let router = Router::builder()
//! 	.route(RouteConfig::view("/", |_| View::text("home")))
//! 	.route(RouteConfig::view("/users/:id", |location| {
//! 		View::text(format!("user {}", location.param("id").unwrap_or("?")))
//! 	}))
//! 	.build();
//!
//! let outlet = Outlet::attach(&router, Container::new(), OutletOptions::default());
//! router.push("/users/42").await?;
//! ```

/// Fine-grained reactive primitives.
pub mod reactive {
	pub use pulse_reactive::*;
}

/// Renderable view nodes and mount containers.
pub mod pages {
	pub use pulse_pages::*;
}

/// The client-side navigation engine.
#[cfg(feature = "router")]
pub mod router {
	pub use pulse_router::*;
}

/// The commonly used surface in one import.
pub mod prelude {
	pub use pulse_pages::{Container, Element, View};
	pub use pulse_reactive::{Effect, Signal, batch};
	#[cfg(feature = "router")]
	pub use pulse_router::{
		HookResult, NavigateOptions, NavigationError, Outlet, OutletOptions, RouteConfig,
		RouteLocation, Router, lazy,
	};
}
