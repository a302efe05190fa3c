//! Scroll restoration and history traversal, end to end.

use std::rc::Rc;

use pulse_pages::View;
use pulse_router::{
	MemorySessionStore, NavigationError, RouteConfig, Router, ScrollPosition, ScrollTarget,
};
use pulse_integration_tests::RecordingViewport;

fn router_with_viewport(viewport: Rc<RecordingViewport>) -> Router {
	Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.route(RouteConfig::view("/articles", |_| View::text("Articles")))
		.route(RouteConfig::view("/about", |_| View::text("About")))
		.viewport(viewport)
		.build()
}

#[tokio::test(start_paused = true)]
async fn back_restores_state_and_saved_scroll() {
	let viewport = RecordingViewport::shared();
	let router = router_with_viewport(Rc::clone(&viewport));

	assert!(router.push("/").await.unwrap());
	assert!(router.push("/articles").await.unwrap());

	// Scroll down the article list, then leave it.
	viewport.offset.set(ScrollPosition::at(0.0, 480.0));
	assert!(router.push("/about").await.unwrap());

	// Going back restores both the reactive state and the offset.
	router.back().await;
	assert_eq!(router.state().path.peek(), "/articles");
	assert_eq!(viewport.last_scroll(), Some(ScrollPosition::at(0.0, 480.0)));
}

#[tokio::test]
async fn scroll_store_evicts_least_recently_used() {
	let viewport = RecordingViewport::shared();
	let router = Router::builder()
		.route(RouteConfig::view("/:page", |_| View::text("page")))
		.route(RouteConfig::view("/", |_| View::text("home")))
		.viewport(viewport.clone())
		.scroll_capacity(2)
		.build();

	assert!(router.push("/a").await.unwrap());
	assert!(router.push("/b").await.unwrap());
	assert!(router.push("/c").await.unwrap());
	// Saved so far: "/", "/a", "/b". Over capacity 2, "/" is evicted.
	assert!(router.scroll().position("/").is_none());

	// Touch "/a", then save another: "/b" is now the eviction victim.
	assert!(router.scroll().position("/a").is_some());
	assert!(router.push("/d").await.unwrap());
	assert!(router.scroll().position("/b").is_none());
	assert!(router.scroll().position("/a").is_some());
}

#[tokio::test]
async fn custom_scroll_behavior_receives_saved_position() {
	let viewport = RecordingViewport::shared();
	let router = Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.route(RouteConfig::view("/long", |_| View::text("Long")))
		.viewport(viewport.clone())
		.scroll_behavior(|to, _from, saved| {
			if to.path == "/long" {
				Ok(Some(ScrollTarget::Element {
					selector: "#top".into(),
				}))
			} else {
				Ok(saved.map(ScrollTarget::Position))
			}
		})
		.build();

	assert!(router.push("/long").await.unwrap());
	assert_eq!(*viewport.selectors.borrow(), vec!["#top"]);
}

#[tokio::test]
async fn failing_scroll_behavior_falls_back_to_origin() {
	let viewport = RecordingViewport::shared();
	let router = Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.viewport(viewport.clone())
		.scroll_behavior(|_, _, _| Err(NavigationError::hook("bad behavior")))
		.build();

	assert!(router.push("/").await.unwrap());
	assert_eq!(viewport.last_scroll(), Some(ScrollPosition::ORIGIN));
}

#[tokio::test]
async fn scroll_positions_survive_router_rebuild_via_session_store() {
	let store = Rc::new(MemorySessionStore::new());
	let viewport = RecordingViewport::shared();

	{
		let router = Router::builder()
			.route(RouteConfig::view("/", |_| View::text("Home")))
			.route(RouteConfig::view("/docs", |_| View::text("Docs")))
			.viewport(viewport.clone())
			.session_store(store.clone())
			.build();
		assert!(router.push("/docs").await.unwrap());
		viewport.offset.set(ScrollPosition::at(0.0, 321.0));
		assert!(router.push("/").await.unwrap());
	}

	// A rebuilt router (page reload) restores the snapshot.
	let router = Router::builder()
		.route(RouteConfig::view("/", |_| View::text("Home")))
		.route(RouteConfig::view("/docs", |_| View::text("Docs")))
		.viewport(viewport.clone())
		.session_store(store)
		.build();
	assert_eq!(
		router.scroll().position("/docs"),
		Some(ScrollPosition::at(0.0, 321.0))
	);
}
