//! End-to-end navigation pipeline scenarios.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_pages::{Container, View};
use pulse_router::middleware::Next;
use pulse_router::{
	HookResult, MiddlewareContext, NavigateOptions, NavigationError, NavigationMiddleware, Outlet,
	OutletOptions, RouteConfig, Router,
};
use tokio::task::LocalSet;

fn sample_router() -> Router {
	Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.route(RouteConfig::view("/users/:id", |location| {
			View::text(format!("User {}", location.param("id").unwrap_or("?")))
		}))
		.build()
}

#[tokio::test]
async fn navigating_resolves_path_params_and_query() {
	let router = sample_router();
	let options = NavigateOptions {
		query: HashMap::from([("tab".to_string(), "posts".to_string())]),
		..Default::default()
	};

	assert!(router.navigate("/users/42", options).await.unwrap());

	let state = router.state();
	assert_eq!(state.path.peek(), "/users/42");
	assert_eq!(state.params.peek().get("id").map(String::as_str), Some("42"));
	assert_eq!(state.query.peek().get_str("tab"), Some("posts"));
}

#[tokio::test]
async fn middleware_runs_in_onion_order() {
	struct Marker {
		name: &'static str,
		log: Rc<RefCell<Vec<String>>>,
	}

	#[async_trait(?Send)]
	impl NavigationMiddleware for Marker {
		async fn handle(
			&self,
			ctx: &mut MiddlewareContext,
			next: Next<'_>,
		) -> Result<(), NavigationError> {
			self.log.borrow_mut().push(format!("{}-before", self.name));
			next.run(ctx).await?;
			self.log.borrow_mut().push(format!("{}-after", self.name));
			Ok(())
		}
	}

	let log = Rc::new(RefCell::new(Vec::new()));
	let router = Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.middleware(Marker {
			name: "A",
			log: Rc::clone(&log),
		})
		.middleware(Marker {
			name: "B",
			log: Rc::clone(&log),
		})
		.build();

	assert!(router.push("/").await.unwrap());
	assert_eq!(
		*log.borrow(),
		vec!["A-before", "B-before", "B-after", "A-after"]
	);
}

#[tokio::test]
async fn redirect_resolves_to_final_path() {
	let router = Router::builder()
		.route(RouteConfig::view("/new", |_| View::text("New")))
		.route(RouteConfig::redirect("/old", "/new"))
		.build();

	assert!(router.push("/old").await.unwrap());
	assert_eq!(router.state().path.peek(), "/new");
}

#[tokio::test]
async fn blocked_navigation_leaves_state_unchanged() {
	let router = Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.route(
			RouteConfig::view("/members", |_| View::text("Members"))
				.before_enter(|_, _| async { Ok(HookResult::Block) }),
		)
		.build();
	assert!(router.push("/?tab=a").await.unwrap());

	let before = (
		router.state().path.peek(),
		router.state().params.peek(),
		router.state().query.peek(),
	);
	assert!(!router.push("/members").await.unwrap());
	let after = (
		router.state().path.peek(),
		router.state().params.peek(),
		router.state().query.peek(),
	);
	assert_eq!(before, after);
}

#[tokio::test]
async fn loading_settles_even_when_a_hook_fails() {
	let router = sample_router();
	router.before_each(|_, _| async { Err(NavigationError::hook("flaky auth service")) });

	assert!(router.push("/").await.is_err());
	assert!(!router.state().loading.peek());
	assert!(router.state().error.peek().is_some());
}

#[tokio::test(start_paused = true)]
async fn concurrent_navigations_interleave_last_commit_wins() {
	let local = LocalSet::new();
	local
		.run_until(async {
			let router = Router::builder()
				.route(RouteConfig::view("/", |_| View::text("Home")))
				.route(
					RouteConfig::view("/slow", |_| View::text("Slow")).before_enter(
						|_, _| async {
							tokio::time::sleep(Duration::from_millis(100)).await;
							Ok(HookResult::Continue)
						},
					),
				)
				.route(RouteConfig::view("/fast", |_| View::text("Fast")))
				.build();

			// The slow navigation starts first but commits last; no
			// queueing, the router interleaves.
			let slow_router = router.clone();
			let slow = tokio::task::spawn_local(async move {
				slow_router.push("/slow").await.unwrap()
			});
			assert!(router.push("/fast").await.unwrap());
			assert_eq!(router.state().path.peek(), "/fast");

			assert!(slow.await.unwrap());
			assert_eq!(router.state().path.peek(), "/slow");
		})
		.await;
}

#[tokio::test]
async fn outlet_renders_committed_route_end_to_end() {
	let local = LocalSet::new();
	local
		.run_until(async {
			let router = sample_router();
			let outlet = Outlet::attach(&router, Container::new(), OutletOptions::default());

			assert!(router.push("/users/7").await.unwrap());
			assert_eq!(outlet.container().render_to_string(), "User 7");

			assert!(router.push("/").await.unwrap());
			assert_eq!(outlet.container().render_to_string(), "Home");
		})
		.await;
}

#[tokio::test]
async fn leave_and_enter_callbacks_fire_around_commit() {
	let router = sample_router();
	let log = Rc::new(RefCell::new(Vec::new()));

	let leave_log = Rc::clone(&log);
	router.on_before_leave("/", move |_, _| {
		leave_log.borrow_mut().push("leave /".to_string());
		async { true }
	});
	let enter_log = Rc::clone(&log);
	router.on_after_enter("/users/1", move |to, _| {
		enter_log.borrow_mut().push(format!("enter {}", to.path));
	});

	assert!(router.push("/").await.unwrap());
	assert!(router.push("/users/1").await.unwrap());
	assert_eq!(*log.borrow(), vec!["leave /", "enter /users/1"]);
}
